//! Traversal diagnostics sinks
//!
//! The analysis driver reports what it does through a `DiagnosticsSink`.
//! Every call site is guarded by the sink's `ENABLED` constant, so with
//! `NoopSink` the event values are never even constructed.
//!
//! `FileSink` writes two plain-text logs:
//! - an event log, one `[timestamp] EVENT key=value ...` line per event
//! - a type-frequency log, one `count<TAB>type` line per canonical type,
//!   most frequent first
//!
//! Both are flushed by `finish()` or, on any early exit, when the sink drops.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Something the driver did while walking a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalEvent<'a> {
    UnitStarted {
        file: &'a str,
    },
    DeclarationVisited {
        kind: &'a str,
        name: &'a str,
    },
    DeclarationSkipped {
        name: &'a str,
        reason: &'a str,
    },
    RecordEmitted {
        kind: &'a str,
        qualified_name: &'a str,
    },
    MemberInherited {
        owner: &'a str,
        base: &'a str,
        member: &'a str,
    },
    DiagnosticRecorded {
        kind: &'a str,
        message: &'a str,
    },
    UnitFinished {
        file: &'a str,
        records: usize,
        diagnostics: usize,
    },
}

impl TraversalEvent<'_> {
    fn render(&self) -> String {
        match self {
            TraversalEvent::UnitStarted { file } => format!("UNIT_START file={}", file),
            TraversalEvent::DeclarationVisited { kind, name } => {
                format!("VISIT kind={} name={}", kind, name)
            }
            TraversalEvent::DeclarationSkipped { name, reason } => {
                format!("SKIP name={} reason={}", name, reason)
            }
            TraversalEvent::RecordEmitted {
                kind,
                qualified_name,
            } => format!("EMIT kind={} qualified_name={}", kind, qualified_name),
            TraversalEvent::MemberInherited {
                owner,
                base,
                member,
            } => format!("INHERIT owner={} base={} member={}", owner, base, member),
            TraversalEvent::DiagnosticRecorded { kind, message } => {
                format!("DIAGNOSTIC kind={} message={:?}", kind, message)
            }
            TraversalEvent::UnitFinished {
                file,
                records,
                diagnostics,
            } => format!(
                "UNIT_END file={} records={} diagnostics={}",
                file, records, diagnostics
            ),
        }
    }
}

/// Receiver for traversal events and type statistics
pub trait DiagnosticsSink {
    /// Callers skip building events entirely when this is false
    const ENABLED: bool;

    fn event(&mut self, event: &TraversalEvent<'_>);

    /// Count one occurrence of a canonical type name
    fn type_seen(&mut self, canonical: &str);

    fn finish(&mut self) -> io::Result<()>;
}

impl<S: DiagnosticsSink> DiagnosticsSink for &mut S {
    const ENABLED: bool = S::ENABLED;

    fn event(&mut self, event: &TraversalEvent<'_>) {
        (**self).event(event);
    }

    fn type_seen(&mut self, canonical: &str) {
        (**self).type_seen(canonical);
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

// =============================================================================
// NOOP SINK
// =============================================================================

/// Sink used when diagnostics logging is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    const ENABLED: bool = false;

    #[inline(always)]
    fn event(&mut self, _event: &TraversalEvent<'_>) {}

    #[inline(always)]
    fn type_seen(&mut self, _canonical: &str) {}

    #[inline(always)]
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// MEMORY SINK
// =============================================================================

/// Sink keeping rendered events and type counts in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub events: Vec<String>,
    pub type_counts: BTreeMap<String, u64>,
}

impl DiagnosticsSink for MemorySink {
    const ENABLED: bool = true;

    fn event(&mut self, event: &TraversalEvent<'_>) {
        self.events.push(event.render());
    }

    fn type_seen(&mut self, canonical: &str) {
        *self.type_counts.entry(canonical.to_string()).or_insert(0) += 1;
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// FILE SINK
// =============================================================================

/// Sink writing the debug-event log and the type-frequency statistics log
#[derive(Debug)]
pub struct FileSink {
    events: BufWriter<File>,
    stats_path: PathBuf,
    type_counts: BTreeMap<String, u64>,
    finished: bool,
}

impl FileSink {
    /// Open both logs, truncating previous contents
    pub fn create(event_log: &Path, stats_log: &Path) -> io::Result<Self> {
        for path in [event_log, stats_log] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let events = BufWriter::new(File::create(event_log)?);
        File::create(stats_log)?;

        Ok(FileSink {
            events,
            stats_path: stats_log.to_path_buf(),
            type_counts: BTreeMap::new(),
            finished: false,
        })
    }

    fn write_stats(&self) -> io::Result<()> {
        let mut counts: Vec<(&String, &u64)> = self.type_counts.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let mut writer = BufWriter::new(File::create(&self.stats_path)?);
        for (name, count) in counts {
            writeln!(writer, "{}\t{}", count, name)?;
        }
        writer.flush()
    }
}

impl DiagnosticsSink for FileSink {
    const ENABLED: bool = true;

    fn event(&mut self, event: &TraversalEvent<'_>) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        // A failed debug write must not interrupt the analysis.
        let _ = writeln!(self.events, "[{}] {}", timestamp, event.render());
    }

    fn type_seen(&mut self, canonical: &str) {
        *self.type_counts.entry(canonical.to_string()).or_insert(0) += 1;
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.write_stats()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_noop_sink_is_disabled() {
        assert!(!NoopSink::ENABLED);
        assert!(<&mut MemorySink as DiagnosticsSink>::ENABLED);
    }

    #[test]
    fn test_memory_sink_records_events() {
        let mut sink = MemorySink::default();
        sink.event(&TraversalEvent::DeclarationSkipped {
            name: "detail",
            reason: "anonymous",
        });
        sink.type_seen("int");
        sink.type_seen("int");

        assert_eq!(sink.events, vec!["SKIP name=detail reason=anonymous"]);
        assert_eq!(sink.type_counts.get("int"), Some(&2));
    }

    #[test]
    fn test_file_sink_writes_sorted_stats() -> io::Result<()> {
        let temp_dir = TempDir::new()?;
        let events = temp_dir.path().join("events.log");
        let stats = temp_dir.path().join("stats").join("types.log");

        let mut sink = FileSink::create(&events, &stats)?;
        sink.event(&TraversalEvent::UnitStarted { file: "demo.h" });
        for ty in ["int", "std::string", "int", "bool", "int", "std::string"] {
            sink.type_seen(ty);
        }
        sink.finish()?;

        let event_text = std::fs::read_to_string(&events)?;
        assert!(event_text.contains("UNIT_START file=demo.h"));

        let stats_text = std::fs::read_to_string(&stats)?;
        let lines: Vec<&str> = stats_text.lines().collect();
        assert_eq!(lines, vec!["3\tint", "2\tstd::string", "1\tbool"]);
        Ok(())
    }

    #[test]
    fn test_file_sink_flushes_on_drop() -> io::Result<()> {
        let temp_dir = TempDir::new()?;
        let events = temp_dir.path().join("events.log");
        let stats = temp_dir.path().join("types.log");

        {
            let mut sink = FileSink::create(&events, &stats)?;
            sink.event(&TraversalEvent::RecordEmitted {
                kind: "class",
                qualified_name: "demo::Player",
            });
            sink.type_seen("demo::Player");
        }

        let event_text = std::fs::read_to_string(&events)?;
        assert!(event_text.contains("EMIT kind=class qualified_name=demo::Player"));
        let stats_text = std::fs::read_to_string(&stats)?;
        assert_eq!(stats_text.trim(), "1\tdemo::Player");
        Ok(())
    }
}
