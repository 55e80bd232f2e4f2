//! Various event sinks for different use cases

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{error, trace};

use crate::bp_interface::{Event, EventSink, SimTime};

// ============================================================================
// Console Logging Sink
// ============================================================================

/// Event sink that forwards every event to the `log` facade at trace level
pub struct ConsoleEventSink {
    enabled: bool,
}

impl ConsoleEventSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl EventSink for ConsoleEventSink {
    fn log(&mut self, time: SimTime, event: Event) {
        if !self.enabled {
            return;
        }

        match event {
            Event::Arrival { block, source } => {
                trace!("{:>12.4} Arrival       block:{} source:{}", time, block, source);
            }
            Event::Transmission {
                sender,
                receiver,
                block: Some(block),
            } => {
                trace!(
                    "{:>12.4} Transmission  block:{} {} -> {}",
                    time,
                    block,
                    sender,
                    receiver
                );
            }
            Event::Transmission {
                sender,
                receiver,
                block: None,
            } => {
                trace!("{:>12.4} Wasted        {} -> {}", time, sender, receiver);
            }
            Event::Consistent { cycles } => {
                trace!("{:>12.4} Consistent    cycles:{}", time, cycles);
            }
        }
    }
}

// ============================================================================
// CSV Event Sink
// ============================================================================

/// CSV event sink for structured data export
pub struct CsvEventSink {
    writer: BufWriter<File>,
}

impl CsvEventSink {
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Write CSV header
        writeln!(writer, "time,event_type,block,sender,receiver,cycles")?;

        Ok(Self { writer })
    }
}

impl EventSink for CsvEventSink {
    fn log(&mut self, time: SimTime, event: Event) {
        let kind = event.kind();
        let result = match event {
            Event::Arrival { block, source } => {
                writeln!(self.writer, "{},{},{},{},,", time, kind, block, source)
            }
            Event::Transmission {
                sender,
                receiver,
                block,
            } => {
                let block = block.map(|b| b.to_string()).unwrap_or_default();
                writeln!(self.writer, "{},{},{},{},{},", time, kind, block, sender, receiver)
            }
            Event::Consistent { cycles } => {
                writeln!(self.writer, "{},{},,,,{}", time, kind, cycles)
            }
        };

        if let Err(e) = result {
            error!("Error writing to CSV: {}", e);
        }
    }
}

impl Drop for CsvEventSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

// ============================================================================
// Collector Event Sink (In-Memory)
// ============================================================================

/// Collects events in memory for programmatic analysis
#[derive(Default)]
pub struct CollectorEventSink {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub time: SimTime,
    pub event: Event,
}

impl CollectorEventSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    // Query helpers
    pub fn arrivals(&self) -> impl Iterator<Item = &EventRecord> {
        self.events
            .iter()
            .filter(|e| matches!(e.event, Event::Arrival { .. }))
    }

    pub fn transmissions(&self) -> impl Iterator<Item = &EventRecord> {
        self.events
            .iter()
            .filter(|e| matches!(e.event, Event::Transmission { .. }))
    }
}

impl EventSink for CollectorEventSink {
    fn log(&mut self, time: SimTime, event: Event) {
        self.events.push(EventRecord { time, event });
    }
}

// ============================================================================
// Multi Sink (Combine Multiple Sinks)
// ============================================================================

/// Combines multiple event sinks
#[derive(Default)]
pub struct MultiEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl MultiEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for MultiEventSink {
    fn log(&mut self, time: SimTime, event: Event) {
        for sink in &mut self.sinks {
            sink.log(time, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_events(sink: &mut dyn EventSink) {
        sink.log(0.5, Event::Arrival { block: 0, source: 2 });
        sink.log(
            0.7,
            Event::Transmission {
                sender: 2,
                receiver: 1,
                block: Some(0),
            },
        );
        sink.log(
            0.9,
            Event::Transmission {
                sender: 0,
                receiver: 1,
                block: None,
            },
        );
        sink.log(1.1, Event::Consistent { cycles: 1 });
    }

    #[test]
    fn test_collector_queries() {
        let mut sink = CollectorEventSink::new();
        sample_events(&mut sink);

        assert_eq!(sink.events.len(), 4);
        assert_eq!(sink.arrivals().count(), 1);
        assert_eq!(sink.transmissions().count(), 2);
        assert_eq!(sink.events[3].event, Event::Consistent { cycles: 1 });
    }

    #[test]
    fn test_csv_rows() {
        let path = std::env::temp_dir().join(format!("bp_events_{}.csv", std::process::id()));
        {
            let mut sink = CsvEventSink::new(&path).unwrap();
            sample_events(&mut sink);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "time,event_type,block,sender,receiver,cycles");
        assert_eq!(lines[1], "0.5,Arrival,0,2,,");
        assert_eq!(lines[2], "0.7,Transmission,0,2,1,");
        assert_eq!(lines[3], "0.9,Transmission,,0,1,");
        assert_eq!(lines[4], "1.1,Consistent,,,,1");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_multi_sink_fans_out() {
        let path = std::env::temp_dir().join(format!("bp_multi_{}.csv", std::process::id()));
        let mut multi = MultiEventSink::new();
        multi.add_sink(Box::new(ConsoleEventSink::new(true)));
        multi.add_sink(Box::new(CsvEventSink::new(&path).unwrap()));
        sample_events(&mut multi);
        drop(multi);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 5);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_console_sink_disabled_is_silent() {
        let mut sink = ConsoleEventSink::new(false);
        sample_events(&mut sink);
    }
}
