//! Writes downloaded results and EDA charts to disk.
//!
//! Each file is staged in a temporary file next to its destination and
//! persisted under the final name. A staging file that is never persisted is
//! removed when its handle drops.

use crate::error::WorkflowError;
use crate::model::EdaArtifact;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const RESULTS_FILE_NAME: &str = "ml_data_app_results.csv";
pub const RESULTS_CONTENT_TYPE: &str = "text/csv";
const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub bytes: u64,
    pub content_type: &'static str,
    /// RFC 3339, UTC.
    pub exported_at: String,
}

#[derive(Debug, Clone)]
pub struct ResultExport {
    dir: PathBuf,
}

impl ResultExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Save the results CSV under [`RESULTS_FILE_NAME`], replacing any earlier export.
    pub fn export(&self, payload: &str) -> Result<ExportedFile, WorkflowError> {
        self.persist(RESULTS_FILE_NAME, payload.as_bytes(), RESULTS_CONTENT_TYPE)
    }

    /// Save every generated chart as `eda_<chart>.png`. Charts the service
    /// did not produce are skipped.
    pub fn export_eda_images(&self, eda: &EdaArtifact) -> Result<Vec<ExportedFile>, WorkflowError> {
        eda.charts()
            .into_iter()
            .map(|(chart, png)| {
                let name = format!("eda_{}.png", chart.file_stem());
                self.persist(&name, png, PNG_CONTENT_TYPE)
            })
            .collect()
    }

    fn persist(
        &self,
        name: &str,
        contents: &[u8],
        content_type: &'static str,
    ) -> Result<ExportedFile, WorkflowError> {
        let fail = |what: &str, e: std::io::Error| {
            WorkflowError::Export(format!("{what} {}: {e}", self.dir.display()))
        };
        std::fs::create_dir_all(&self.dir).map_err(|e| fail("cannot create", e))?;
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(|e| fail("cannot write to", e))?;
        staged
            .write_all(contents)
            .and_then(|()| staged.flush())
            .map_err(|e| fail("cannot write to", e))?;

        let path = self.dir.join(name);
        staged
            .persist(&path)
            .map_err(|e| WorkflowError::Export(format!("cannot save {}: {}", path.display(), e.error)))?;

        tracing::info!(path = %path.display(), bytes = contents.len(), "export written");
        Ok(ExportedFile {
            path,
            bytes: contents.len() as u64,
            content_type,
            exported_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DatasetRevision;
    use std::path::Path;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn results_land_under_the_fixed_name_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let export = ResultExport::new(dir.path());

        let first = export.export("a,b\n1,2\n").expect("first export");
        let second = export.export("a,b\n3,4\n5,6\n").expect("second export");

        assert_eq!(first.path, second.path);
        assert_eq!(second.path, dir.path().join(RESULTS_FILE_NAME));
        assert_eq!(second.content_type, "text/csv");
        assert_eq!(second.bytes, 12);
        assert_eq!(
            std::fs::read_to_string(&second.path).expect("read back"),
            "a,b\n3,4\n5,6\n"
        );
        assert_eq!(entries(dir.path()), vec![RESULTS_FILE_NAME.to_string()]);
        assert!(OffsetDateTime::parse(&second.exported_at, &Rfc3339).is_ok());
    }

    #[test]
    fn unwritable_directory_is_an_export_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").expect("write blocker");

        let err = ResultExport::new(blocker.join("out"))
            .export("x\n")
            .expect_err("must fail");
        assert!(matches!(err, WorkflowError::Export(_)));
        assert_eq!(entries(dir.path()), vec!["blocker".to_string()]);
    }

    #[test]
    fn only_generated_charts_are_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let eda = EdaArtifact {
            histograms: Some(b"\x89PNG hist".to_vec()),
            correlation_matrix: None,
            boxplots: Some(b"\x89PNG box".to_vec()),
            generated_against: DatasetRevision(1),
        };

        let files = ResultExport::new(dir.path())
            .export_eda_images(&eda)
            .expect("export charts");

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.content_type == "image/png"));
        assert_eq!(
            entries(dir.path()),
            vec!["eda_boxplots.png".to_string(), "eda_histograms.png".to_string()]
        );
    }
}
