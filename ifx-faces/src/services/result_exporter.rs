//! Export of accumulated batch results
//!
//! JSON carries the full result set; CSV has one row per (probe, match) pair
//! in probe order, then match order. Exporting never touches the session.

use crate::models::{MatchResult, ResultSet, Threshold};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EXPORT_BASENAME: &str = "face-recognition-results";
const CSV_HEADER: [&str; 6] = [
    "Input File",
    "Compare File",
    "Matched",
    "Distance",
    "Threshold",
    "Result",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No results to export")]
    NoResultsToExport,

    #[error("Export serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

/// A generated download
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    threshold: f64,
    total_probes: usize,
    total_matches: usize,
    results: Vec<JsonProbe<'a>>,
}

#[derive(Serialize)]
struct JsonProbe<'a> {
    probe_id: &'a str,
    probe_name: &'a str,
    matches: &'a [MatchResult],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    backend_errors: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Serialize a result set in the requested format
pub fn export(
    results: &ResultSet,
    threshold: Threshold,
    format: ExportFormat,
) -> Result<ExportFile, ExportError> {
    if results.is_empty() {
        return Err(ExportError::NoResultsToExport);
    }

    let bytes = match format {
        ExportFormat::Json => to_json(results, threshold)?,
        ExportFormat::Csv => to_csv(results, threshold)?,
    };

    tracing::info!(
        format = format.extension(),
        probes = results.len(),
        bytes = bytes.len(),
        "Results exported"
    );

    Ok(ExportFile {
        file_name: format!("{}.{}", EXPORT_BASENAME, format.extension()),
        content_type: format.content_type(),
        bytes,
    })
}

fn to_json(results: &ResultSet, threshold: Threshold) -> Result<Vec<u8>, ExportError> {
    let document = JsonExport {
        threshold: threshold.value(),
        total_probes: results.len(),
        total_matches: results.total_matches(),
        results: results
            .iter()
            .map(|r| JsonProbe {
                probe_id: &r.probe.id,
                probe_name: &r.probe.name,
                matches: &r.matches,
                backend_errors: &r.backend_errors,
                error: r.error.as_deref(),
            })
            .collect(),
    };

    serde_json::to_vec_pretty(&document).map_err(|e| ExportError::Serialize(e.to_string()))
}

/// Every field is quoted; a name like `2024` or `1.5` must still read back as text
fn to_csv(results: &ResultSet, threshold: Threshold) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| ExportError::Serialize(e.to_string()))?;

    let threshold = threshold.to_string();
    for probe_result in results.iter() {
        for m in &probe_result.matches {
            let distance = m.distance.to_string();
            let score = m.score.to_string();
            writer
                .write_record([
                    probe_result.probe.name.as_str(),
                    m.candidate_name.as_str(),
                    "true",
                    distance.as_str(),
                    threshold.as_str(),
                    score.as_str(),
                ])
                .map_err(|e| ExportError::Serialize(e.to_string()))?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileKind, FileRecord, MatchTier, ProbeResult};
    use crate::services::content_store::ContentStore;

    fn results(store: &ContentStore) -> ResultSet {
        let record = |name: &str| FileRecord {
            id: format!("input-{}", name),
            name: name.to_string(),
            media_type: "image/jpeg".to_string(),
            kind: FileKind::Image,
            size_bytes: 1,
            content: store.acquire(vec![0]),
        };
        let hit = |name: &str, score: f64, distance: f64| MatchResult {
            candidate_id: format!("comparison-{}", name),
            candidate_name: name.to_string(),
            score,
            distance,
            tier: MatchTier::Borderline,
        };

        let mut results = ResultSet::new();
        results.append(ProbeResult::matched(
            record("A \"front\".jpg"),
            vec![hit("X, left.jpg", 72.0, 0.3), hit("Y.jpg", 51.25, 0.48123456789)],
            vec![],
        ));
        results.append(ProbeResult::failed(record("B.jpg"), "API error 500: boom".into()));
        results.append(ProbeResult::matched(record("C.jpg"), vec![], vec![]));
        results
    }

    #[test]
    fn test_empty_results_rejected() {
        for format in [ExportFormat::Json, ExportFormat::Csv] {
            let err = export(&ResultSet::new(), Threshold::default(), format).unwrap_err();
            assert!(matches!(err, ExportError::NoResultsToExport));
        }
    }

    #[test]
    fn test_csv_quotes_and_escapes_text() {
        let store = ContentStore::new();
        let file = export(&results(&store), Threshold::new(50.0), ExportFormat::Csv).unwrap();
        assert_eq!(file.file_name, "face-recognition-results.csv");
        assert_eq!(file.content_type, "text/csv");

        let text = String::from_utf8(file.bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            r#""Input File","Compare File","Matched","Distance","Threshold","Result""#
        );
        assert_eq!(lines[1], r#""A ""front"".jpg","X, left.jpg","true","0.3","50","72""#);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_csv_quotes_numeric_looking_names() {
        let store = ContentStore::new();
        let mut results = ResultSet::new();
        results.append(ProbeResult::matched(
            FileRecord {
                id: "input-2024".to_string(),
                name: "2024".to_string(),
                media_type: "image/jpeg".to_string(),
                kind: FileKind::Image,
                size_bytes: 1,
                content: store.acquire(vec![0]),
            },
            vec![MatchResult {
                candidate_id: "comparison-1.5".to_string(),
                candidate_name: "1.5".to_string(),
                score: 72.0,
                distance: 0.3,
                tier: MatchTier::Borderline,
            }],
            vec![],
        ));

        let file = export(&results, Threshold::new(50.0), ExportFormat::Csv).unwrap();
        let text = String::from_utf8(file.bytes).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with(r#""2024","1.5","#));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "2024");
        assert_eq!(&record[1], "1.5");
    }

    #[test]
    fn test_csv_round_trip() {
        let store = ContentStore::new();
        let results = results(&store);
        let file = export(&results, Threshold::new(50.0), ExportFormat::Csv).unwrap();

        let mut reader = csv::Reader::from_reader(file.bytes.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        let expected: Vec<(String, String, f64, f64)> = results
            .iter()
            .flat_map(|r| {
                r.matches
                    .iter()
                    .map(|m| (r.probe.name.clone(), m.candidate_name.clone(), m.distance, m.score))
            })
            .collect();

        assert_eq!(rows.len(), expected.len());
        for (row, (probe, candidate, distance, score)) in rows.iter().zip(expected) {
            assert_eq!(&row[0], probe);
            assert_eq!(&row[1], candidate);
            assert_eq!(&row[2], "true");
            assert_eq!(row[3].parse::<f64>().unwrap(), distance);
            assert_eq!(row[4].parse::<f64>().unwrap(), 50.0);
            assert_eq!(row[5].parse::<f64>().unwrap(), score);
        }
    }

    #[test]
    fn test_json_keeps_every_probe() {
        let store = ContentStore::new();
        let file = export(&results(&store), Threshold::new(62.5), ExportFormat::Json).unwrap();
        assert_eq!(file.file_name, "face-recognition-results.json");

        let json: serde_json::Value = serde_json::from_slice(&file.bytes).unwrap();
        assert_eq!(json["threshold"], 62.5);
        assert_eq!(json["total_probes"], 3);
        assert_eq!(json["total_matches"], 2);
        assert_eq!(json["results"][0]["probe_name"], "A \"front\".jpg");
        assert_eq!(json["results"][0]["matches"][1]["distance"], 0.48123456789);
        assert_eq!(json["results"][1]["error"], "API error 500: boom");
        assert!(json["results"][2].get("error").is_none());
    }

    #[test]
    fn test_export_does_not_mutate_results() {
        let store = ContentStore::new();
        let results = results(&store);
        let before = results.clone();
        export(&results, Threshold::default(), ExportFormat::Json).unwrap();
        export(&results, Threshold::default(), ExportFormat::Csv).unwrap();
        assert_eq!(results, before);
    }

    #[test]
    fn test_format_from_query_value() {
        let csv: ExportFormat = serde_json::from_str("\"csv\"").unwrap();
        assert_eq!(csv, ExportFormat::Csv);
        assert!(serde_json::from_str::<ExportFormat>("\"xml\"").is_err());
    }
}
