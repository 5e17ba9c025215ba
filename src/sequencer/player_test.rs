use super::*;
use crate::sequencer::script::{DEMO_SCRIPT, TYPE_INTERVAL, realtime_duration};

/// Records every sink call as a line of text.
#[derive(Default)]
struct RecordingSink {
    events: Vec<String>,
    fail_on_table: bool,
}

impl StageSink for RecordingSink {
    fn clear(&mut self) -> io::Result<()> {
        self.events.push("clear".into());
        Ok(())
    }

    fn loader_start(&mut self, label: &str) -> io::Result<()> {
        self.events.push(format!("loader:{label}"));
        Ok(())
    }

    fn loader_end(&mut self) -> io::Result<()> {
        self.events.push("loader_end".into());
        Ok(())
    }

    fn reveal(&mut self, unit: Unit<'_>) -> io::Result<()> {
        self.events.push(match unit {
            Unit::Char(c) => format!("c:{c}"),
            Unit::Bold(s) => format!("b:{s}"),
        });
        Ok(())
    }

    fn text_end(&mut self) -> io::Result<()> {
        self.events.push("text_end".into());
        Ok(())
    }

    fn table(&mut self, table: &Table) -> io::Result<()> {
        if self.fail_on_table {
            return Err(io::Error::other("closed"));
        }
        self.events.push(format!("table:{}", table.title));
        Ok(())
    }
}

fn instant() -> Player {
    Player::new(Pacing::Instant, TYPE_INTERVAL)
}

#[tokio::test]
async fn every_run_emits_the_same_sequence() {
    let mut first = RecordingSink::default();
    let mut second = RecordingSink::default();
    let kinds_a = instant().play(DEMO_SCRIPT, &mut first).await.unwrap();
    let kinds_b = instant().play(DEMO_SCRIPT, &mut second).await.unwrap();

    assert_eq!(kinds_a, kinds_b);
    assert_eq!(first.events, second.events);
    let expected: Vec<&str> = DEMO_SCRIPT.iter().map(Stage::kind).collect();
    assert_eq!(kinds_a, expected);
}

#[tokio::test]
async fn bold_spans_reach_the_sink_whole() {
    let script = [Stage::Typewriter { text: "良率 **94.2%**" }];
    let mut sink = RecordingSink::default();
    instant().play(&script, &mut sink).await.unwrap();

    assert_eq!(sink.events, ["c:良", "c:率", "c: ", "b:94.2%", "text_end"]);
    assert!(sink.events.iter().all(|e| !e.contains("**")));
}

#[tokio::test]
async fn loader_wraps_its_delay() {
    let script = [Stage::Loader { label: "解析中", delay_ms: 10 }, Stage::Pause { delay_ms: 10 }];
    let mut sink = RecordingSink::default();
    let kinds = instant().play(&script, &mut sink).await.unwrap();
    assert_eq!(sink.events, ["loader:解析中", "loader_end"]);
    assert_eq!(kinds, ["loader", "pause"]);
}

#[tokio::test]
async fn sink_error_stops_playback() {
    let mut sink = RecordingSink { fail_on_table: true, ..RecordingSink::default() };
    let err = instant().play(DEMO_SCRIPT, &mut sink).await.unwrap_err();
    assert_eq!(err.to_string(), "closed");
    assert!(sink.events.iter().all(|e| !e.starts_with("table:")));
}

#[tokio::test(start_paused = true)]
async fn realtime_pacing_takes_the_scripted_time() {
    let player = Player::new(Pacing::Realtime, TYPE_INTERVAL);
    let mut sink = RecordingSink::default();

    let start = tokio::time::Instant::now();
    player.play(DEMO_SCRIPT, &mut sink).await.unwrap();
    assert_eq!(start.elapsed(), realtime_duration(DEMO_SCRIPT, TYPE_INTERVAL));
}

/// Records when each unit was revealed, relative to `start`.
struct TimedSink {
    start: tokio::time::Instant,
    reveals: Vec<(String, Duration)>,
}

impl StageSink for TimedSink {
    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn loader_start(&mut self, _label: &str) -> io::Result<()> {
        Ok(())
    }

    fn loader_end(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn reveal(&mut self, unit: Unit<'_>) -> io::Result<()> {
        self.reveals.push((unit.plain(), self.start.elapsed()));
        Ok(())
    }

    fn text_end(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn table(&mut self, _table: &Table) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn bold_span_appears_when_cursor_reaches_closing_marker() {
    let tick = Duration::from_millis(10);
    let script = [Stage::Typewriter { text: "良率 **94.2%**" }];
    let mut sink = TimedSink { start: tokio::time::Instant::now(), reveals: Vec::new() };
    Player::new(Pacing::Realtime, tick).play(&script, &mut sink).await.unwrap();

    // Raw index 10 is the closing "**"; one tick per raw character before it.
    let at = |ticks: u32| tick * ticks;
    assert_eq!(
        sink.reveals,
        [
            ("良".to_string(), at(0)),
            ("率".to_string(), at(1)),
            (" ".to_string(), at(2)),
            ("94.2%".to_string(), at(10)),
        ]
    );
    assert_eq!(sink.start.elapsed(), at(11));
}

#[tokio::test(start_paused = true)]
async fn instant_pacing_does_not_advance_the_clock() {
    let mut sink = RecordingSink::default();
    let start = tokio::time::Instant::now();
    instant().play(DEMO_SCRIPT, &mut sink).await.unwrap();
    assert_eq!(start.elapsed(), std::time::Duration::ZERO);
}
