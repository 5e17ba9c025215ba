//! Response schema for the quotation report.
//!
//! `details` is an array of `{label, value}` pairs rather than an object:
//! schema-constrained providers require objects to declare their properties,
//! and detail labels are free-form.

use super::types::StructuredOutput;

pub const QUOTATION_REPORT_NAME: &str = "submit_quotation_report";

/// Build the structured-output constraint for a quotation report.
#[must_use]
pub fn quotation_report_output() -> StructuredOutput {
    StructuredOutput {
        name: QUOTATION_REPORT_NAME.into(),
        description: "Submit the structured PCB/PCBA quotation report.".into(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "The expert logical process for the analysis."
                },
                "steps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "content": { "type": "string" },
                            "type": { "type": "string", "description": "One of: design, dfm, cost, risk" },
                            "details": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "label": { "type": "string" },
                                        "value": { "type": "string" }
                                    },
                                    "required": ["label", "value"]
                                },
                                "description": "Key technical parameters or data points for this step."
                            }
                        },
                        "required": ["title", "content", "type"]
                    }
                }
            },
            "required": ["reasoning", "steps"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_requires_reasoning_and_steps() {
        let output = quotation_report_output();
        assert_eq!(output.name, QUOTATION_REPORT_NAME);
        assert_eq!(output.schema["type"], "object");
        assert_eq!(output.schema["required"], serde_json::json!(["reasoning", "steps"]));
    }

    #[test]
    fn details_are_label_value_pairs() {
        let output = quotation_report_output();
        let details = &output.schema["properties"]["steps"]["items"]["properties"]["details"];
        assert_eq!(details["type"], "array");
        assert_eq!(details["items"]["required"], serde_json::json!(["label", "value"]));
    }

    #[test]
    fn step_requires_title_content_type() {
        let output = quotation_report_output();
        let step = &output.schema["properties"]["steps"]["items"];
        assert_eq!(step["required"], serde_json::json!(["title", "content", "type"]));
    }
}
