//! Referential-integrity validation run once, ahead of scheduling, over the
//! raw [`Sheets`] (before any id is resolved). Mirrors the intent of a
//! pre-flight `checks` pass: collect everything wrong with an input before
//! failing, rather than raising on the first problem.

use std::collections::{HashMap, HashSet};

use log::{error, info, warn};

use crate::error::{EmptyStream, Error};
use crate::io::Sheets;

/// Everything [`validate`] found, split into what is survivable
/// ([`ValidationReport::empty_streams`]) and what should abort the run
/// ([`ValidationReport::unknown_references`]). Unlike [`Instance::from_sheets`](crate::instance::Instance::from_sheets),
/// which bails on the first dangling reference it meets, this pass walks
/// every sheet and collects every finding so a single CLI invocation can
/// report everything wrong with an input file at once.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub unknown_references: Vec<Error>,
    pub empty_streams: Vec<EmptyStream>,
}

impl ValidationReport {
    pub fn is_fatal(&self) -> bool {
        !self.unknown_references.is_empty()
    }

    /// Log one line per finding, informational confirmations included,
    /// mirroring a checks pass that prints "✔ ..." lines for what passed.
    pub fn log(&self) {
        if self.unknown_references.is_empty() {
            info!("validation: every penalty-sheet and abstract reference resolves");
        }
        for finding in &self.unknown_references {
            error!("validation: {finding}");
        }
        if self.empty_streams.is_empty() {
            info!("validation: every stream has at least one abstract");
        }
        for finding in &self.empty_streams {
            warn!("validation: {finding}");
        }
    }

    /// Consume the report, yielding its first fatal finding if any. The CLI
    /// converts this into the hard error it exits on, after `log` has
    /// already reported everything else that was wrong.
    pub fn into_result(mut self) -> Result<(), Error> {
        if self.unknown_references.is_empty() {
            Ok(())
        } else {
            Err(self.unknown_references.remove(0))
        }
    }
}

fn unknown(sheet: &'static str, kind: &'static str, reference: &str) -> Error {
    Error::UnknownReference {
        sheet: sheet.to_string(),
        kind,
        reference: reference.to_string(),
    }
}

fn check_reference(report: &mut ValidationReport, sheet: &'static str, kind: &'static str, known: &HashSet<&str>, reference: &str) {
    if !known.contains(reference) {
        report.unknown_references.push(unknown(sheet, kind, reference));
    }
}

pub fn validate(sheets: &Sheets) -> ValidationReport {
    let mut report = ValidationReport::default();

    let stream_names: HashSet<&str> = sheets.streams.iter().map(|r| r.name.as_str()).collect();
    let room_names: HashSet<&str> = sheets.rooms.iter().map(|r| r.name.as_str()).collect();
    let session_names: HashSet<&str> = sheets.sessions.iter().map(|r| r.name.as_str()).collect();
    let abstract_refs: HashSet<&str> = sheets.abstracts.iter().map(|r| r.reference.as_str()).collect();

    for (stream, session) in sheets.streams_sessions_penalty.keys() {
        check_reference(&mut report, "streams_sessions|penalty", "stream", &stream_names, stream);
        check_reference(&mut report, "streams_sessions|penalty", "session", &session_names, session);
    }
    for (stream, room) in sheets.streams_rooms_penalty.keys() {
        check_reference(&mut report, "streams_rooms|penalty", "stream", &stream_names, stream);
        check_reference(&mut report, "streams_rooms|penalty", "room", &room_names, room);
    }
    for (session, room) in sheets.sessions_rooms_penalty.keys() {
        check_reference(&mut report, "sessions_rooms|penalty", "session", &session_names, session);
        check_reference(&mut report, "sessions_rooms|penalty", "room", &room_names, room);
    }
    for (a, b) in sheets.streams_streams_penalty.keys() {
        check_reference(&mut report, "streams_streams|penalty", "stream", &stream_names, a);
        check_reference(&mut report, "streams_streams|penalty", "stream", &stream_names, b);
    }

    let mut abstracts_per_stream: HashMap<&str, usize> = HashMap::new();
    for row in &sheets.abstracts {
        if stream_names.contains(row.stream.as_str()) {
            *abstracts_per_stream.entry(row.stream.as_str()).or_insert(0) += 1;
        } else {
            report.unknown_references.push(unknown("abstracts", "stream", &row.stream));
        }
        if let Some(clash) = &row.clash {
            check_reference(&mut report, "abstracts", "abstract", &abstract_refs, clash);
        }
        if let Some(speaker_clash) = &row.speaker_clash {
            check_reference(&mut report, "abstracts", "abstract", &abstract_refs, speaker_clash);
        }
    }

    for row in &sheets.streams {
        if abstracts_per_stream.get(row.name.as_str()).copied().unwrap_or(0) == 0 {
            report.empty_streams.push(EmptyStream(row.name.clone()));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{AbstractRow, StreamRow};

    fn sheets_with(streams: Vec<&str>, abstracts: Vec<(&str, &str)>) -> Sheets {
        Sheets {
            streams: streams.into_iter().map(|name| StreamRow { name: name.to_string() }).collect(),
            abstracts: abstracts
                .into_iter()
                .map(|(reference, stream)| AbstractRow {
                    reference: reference.to_string(),
                    stream: stream.to_string(),
                    required_timeslots: 1,
                    order: None,
                    clash: None,
                    speaker_clash: None,
                })
                .collect(),
            ..Sheets::default()
        }
    }

    #[test]
    fn flags_stream_with_no_abstracts() {
        let sheets = sheets_with(vec!["Empty", "Full"], vec![("a1", "Full")]);
        let report = validate(&sheets);
        assert_eq!(report.empty_streams, vec![EmptyStream("Empty".to_string())]);
        assert!(!report.is_fatal());
    }

    #[test]
    fn flags_abstract_with_unknown_stream() {
        let sheets = sheets_with(vec!["Full"], vec![("a1", "Nonexistent")]);
        let report = validate(&sheets);
        assert!(report.is_fatal());
        assert_eq!(report.unknown_references.len(), 1);
    }

    #[test]
    fn flags_abstract_with_unknown_clash() {
        let mut sheets = sheets_with(vec!["Full"], vec![("a1", "Full")]);
        sheets.abstracts[0].clash = Some("ghost".to_string());
        let report = validate(&sheets);
        assert!(report.is_fatal());
    }

    #[test]
    fn empty_sheets_have_no_findings() {
        let report = validate(&Sheets::default());
        assert!(!report.is_fatal());
        assert!(report.empty_streams.is_empty());
    }
}
