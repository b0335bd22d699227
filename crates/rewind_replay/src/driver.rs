//! Trace replay driver.
//!
//! Reads trace lines strictly in file order, creates entities lazily and
//! routes each message to its destination. The first fatal error aborts
//! the run; lines after it are never read.

use crate::capability::Capability;
use crate::entity::Entity;
use crate::registry::EntityTypeRegistry;
use crate::stats::{Delivery, DriverState, ReplayStats, ReplaySummary};
use rewind_core::{CoreError, CoreResult, DumpOptions, Guid, KindCode};
use rewind_log::{EntityRef, Message, MessageClass, MessageClassifier, TraceLine, TraceLines};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

struct OpenTrace {
    path: PathBuf,
    reader: BufReader<File>,
}

struct OpenOutput {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Replay driver owning both registries and every entity
pub struct Driver {
    registry: EntityTypeRegistry,
    classifier: MessageClassifier,
    entities: BTreeMap<Guid, Entity>,
    trace: Option<OpenTrace>,
    output: Option<OpenOutput>,
    state: DriverState,
    stats: ReplayStats,
}

impl Driver {
    /// Create a driver over configured registries
    #[must_use]
    pub fn new(registry: EntityTypeRegistry, classifier: MessageClassifier) -> Self {
        Self {
            registry,
            classifier,
            entities: BTreeMap::new(),
            trace: None,
            output: None,
            state: DriverState::Idle,
            stats: ReplayStats::new(),
        }
    }

    /// Register an entity kind by capability names
    ///
    /// # Errors
    ///
    /// Returns error if replay has started or the kind does not compose
    pub fn register_kind(&mut self, code: KindCode, label: &str, capabilities: &[&str]) -> CoreResult<()> {
        self.registry.register(code, label, capabilities)
    }

    /// Register an entity kind from capability instances
    ///
    /// # Errors
    ///
    /// Returns error if replay has started or the kind does not compose
    pub fn register_kind_with(
        &mut self,
        code: KindCode,
        label: &str,
        capabilities: Vec<Arc<dyn Capability>>,
    ) -> CoreResult<()> {
        self.registry.register_capabilities(code, label, capabilities)
    }

    /// Register a message class for a kind string
    ///
    /// # Errors
    ///
    /// Returns error if replay has started
    pub fn register_message_class(&mut self, kind: &str, class: Arc<dyn MessageClass>) -> CoreResult<()> {
        self.classifier.register(kind, class)
    }

    /// Entity type registry
    #[must_use]
    pub fn registry(&self) -> &EntityTypeRegistry {
        &self.registry
    }

    /// Message classifier
    #[must_use]
    pub fn classifier(&self) -> &MessageClassifier {
        &self.classifier
    }

    /// Open the trace file, closing any previous one
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened
    pub fn open_trace(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening trace file");
        let file = File::open(path).map_err(|err| CoreError::io(path.display().to_string(), &err))?;
        self.trace = Some(OpenTrace {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        });
        Ok(())
    }

    /// Create the output file, closing any previous one
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be created or the previous one
    /// cannot be flushed
    pub fn open_output(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        self.close_output()?;
        let path = path.as_ref();
        info!(path = %path.display(), "opening output file");
        let file = File::create(path).map_err(|err| CoreError::io(path.display().to_string(), &err))?;
        self.output = Some(OpenOutput {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        });
        Ok(())
    }

    /// Replay the open trace file from its beginning
    ///
    /// Entities and histories from earlier runs are kept, so reading the
    /// same file twice delivers every message twice.
    ///
    /// # Errors
    ///
    /// Returns `TraceNotOpen` without an open trace, `Io` on read failure,
    /// or the first fatal replay error
    pub fn read_trace(&mut self) -> CoreResult<ReplaySummary> {
        let mut open = self.trace.take().ok_or(CoreError::TraceNotOpen)?;
        let source = open.path.display().to_string();
        let result = match open.reader.rewind() {
            Ok(()) => self.replay(&mut open.reader, &source),
            Err(err) => Err(CoreError::io(source.clone(), &err)),
        };
        self.trace = Some(open);
        result
    }

    /// Replay lines from any buffered reader
    ///
    /// Freezes both registries before the first line is read.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; the driver is then `Aborted`
    pub fn replay<R: BufRead>(&mut self, reader: R, source: &str) -> CoreResult<ReplaySummary> {
        self.registry.freeze();
        self.classifier.freeze();
        self.state = DriverState::Reading;
        info!(source, "reading trace");

        let mut lines = TraceLines::new(reader, source);
        let mut run = ReplayStats::new();
        let outcome = loop {
            match lines.next_line() {
                Ok(Some((line_number, line))) => {
                    if let Err(err) = self.route(line_number, line, &mut run) {
                        break Err(err);
                    }
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.stats.merge(&run);

        match outcome {
            Ok(()) => {
                self.state = DriverState::Finished;
                let summary = ReplaySummary {
                    source: source.to_string(),
                    stats: run,
                    entities: self.entities.len(),
                };
                info!(%summary, "replay finished");
                Ok(summary)
            }
            Err(err) => {
                self.state = DriverState::Aborted;
                warn!(source, line = lines.line_number(), error = %err, "replay aborted");
                Err(err)
            }
        }
    }

    /// Parse and route a single trace line
    ///
    /// Freezes both registries like `replay` does.
    ///
    /// # Errors
    ///
    /// Returns `MalformedTraceLine`, `UnknownEntityKind` or
    /// `UnregisteredMessageKind`
    pub fn transport_line(&mut self, line_number: usize, line: &str) -> CoreResult<Delivery> {
        self.registry.freeze();
        self.classifier.freeze();
        let mut run = ReplayStats::new();
        let result = self.route(line_number, line, &mut run);
        self.stats.merge(&run);
        result
    }

    fn route(&mut self, line_number: usize, line: &str, run: &mut ReplayStats) -> CoreResult<Delivery> {
        let parsed = TraceLine::parse(line).ok_or_else(|| CoreError::MalformedTraceLine {
            line_number,
            line: line.to_string(),
        })?;

        self.ensure_entity(parsed.source, run)?;
        self.ensure_entity(parsed.destination, run)?;

        let (kind, class) = self.classifier.resolve(parsed.type_code, parsed.subtype)?;
        let mut message = Message::new(
            parsed.timestamp,
            kind,
            parsed.source,
            parsed.destination,
            class,
        )
        .with_payload(parsed.data);
        if let Some(subtype) = parsed.subtype {
            message = message.with_subtype(subtype);
        }

        let destination = parsed.destination;
        let entity = self
            .entities
            .get_mut(&destination.guid)
            .ok_or(CoreError::UnknownEntityKind {
                code: destination.kind,
                guid: destination.guid,
            })?;

        if entity.responds_to(message.kind()) {
            trace!(line = line_number, %message, "delivered");
            run.record(Delivery::Delivered, message.kind().as_str());
            entity.notify(message);
            Ok(Delivery::Delivered)
        } else {
            debug!(line = line_number, entity = %entity, kind = %message.kind(), "dropped message");
            run.record(Delivery::Dropped, message.kind().as_str());
            Ok(Delivery::Dropped)
        }
    }

    fn ensure_entity(&mut self, reference: EntityRef, run: &mut ReplayStats) -> CoreResult<()> {
        if let Some(existing) = self.entities.get(&reference.guid) {
            if existing.kind().code() != reference.kind {
                warn!(
                    guid = %reference.guid,
                    known = %existing.kind().code(),
                    seen = %reference.kind,
                    "guid seen with a different kind; keeping the first"
                );
            }
            return Ok(());
        }

        let kind = self.registry.resolve(reference.kind, reference.guid)?;
        let entity = Entity::new(reference.guid, kind);
        info!(guid = %reference.guid, kind = entity.kind().label(), "created entity");
        self.entities.insert(reference.guid, entity);
        run.entities_created += 1;
        Ok(())
    }

    /// Dump every entity in guid order to the open output, or stdout
    ///
    /// # Errors
    ///
    /// Returns `Io` if writing fails
    pub fn dump_all(&mut self, options: &DumpOptions) -> CoreResult<()> {
        info!(entities = self.entities.len(), "dumping all entities");
        match self.output.as_mut() {
            Some(output) => {
                let path = output.path.display().to_string();
                write_entities(&self.entities, options, &mut output.writer)
                    .and_then(|()| output.writer.flush())
                    .map_err(|err| CoreError::io(path, &err))
            }
            None => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                write_entities(&self.entities, options, &mut out)
                    .and_then(|()| out.flush())
                    .map_err(|err| CoreError::io("<stdout>", &err))
            }
        }
    }

    /// Dump every entity in guid order to `out`
    ///
    /// # Errors
    ///
    /// Returns `Io` if writing fails
    pub fn dump_all_to(&self, options: &DumpOptions, out: &mut dyn Write) -> CoreResult<()> {
        write_entities(&self.entities, options, out).map_err(|err| CoreError::io("<writer>", &err))
    }

    /// Entity by guid
    #[must_use]
    pub fn entity(&self, guid: Guid) -> Option<&Entity> {
        self.entities.get(&guid)
    }

    /// Entities in guid order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Totals over every replay run
    #[must_use]
    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Close the trace and flush and close the output
    ///
    /// # Errors
    ///
    /// Returns `Io` if the output cannot be flushed
    pub fn close(&mut self) -> CoreResult<()> {
        self.trace = None;
        self.close_output()
    }

    fn close_output(&mut self) -> CoreResult<()> {
        if let Some(mut output) = self.output.take() {
            output
                .writer
                .flush()
                .map_err(|err| CoreError::io(output.path.display().to_string(), &err))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("state", &self.state)
            .field("entities", &self.entities.len())
            .field("trace", &self.trace.as_ref().map(|t| &t.path))
            .field("output", &self.output.as_ref().map(|o| &o.path))
            .field("stats", &self.stats)
            .finish()
    }
}

fn write_entities(
    entities: &BTreeMap<Guid, Entity>,
    options: &DumpOptions,
    out: &mut dyn Write,
) -> io::Result<()> {
    for (guid, entity) in entities {
        writeln!(out, "\n--- ENTITY {} ---\n", guid)?;
        entity.dump(options, out)?;
        writeln!(out, "\n------------------\n")?;
    }
    Ok(())
}
