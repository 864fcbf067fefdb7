//! The per-task pipeline: fetch, transfer, decode, parse, write, submit.

use std::sync::Arc;

use transformat_columnar::{ColumnarWriter, masked_path_for, output_path_for};
use transformat_config::Settings;
use transformat_data::{Encoding, FieldDefinition, FileRecordRepository, FormatType, TaskRepository, TaskStatus};
use transformat_downstream::DownstreamClient;
use transformat_errors::{Error, Result};
use transformat_parse::{Strategy, decode, detect, parse_stream};
use transformat_transfer::{DEFAULT_TIMEOUT, SftpConfig, SftpSession};

/// Shared, once-constructed dependencies the file processor needs per task.
pub struct FileProcessor {
    settings: Arc<Settings>,
    task_repo: TaskRepository,
    file_repo: FileRecordRepository,
    downstream: DownstreamClient,
    writer: ColumnarWriter,
}

impl FileProcessor {
    /// Build a processor from its shared, once-constructed dependencies.
    #[must_use]
    pub fn new(
        settings: Arc<Settings>,
        task_repo: TaskRepository,
        file_repo: FileRecordRepository,
        downstream: DownstreamClient,
    ) -> Self {
        let writer = ColumnarWriter::new(settings.stream_batch_size);
        Self {
            settings,
            task_repo,
            file_repo,
            downstream,
            writer,
        }
    }

    /// Run the full pipeline for one task.
    ///
    /// On any error, the task is marked `failed` with the rendered message
    /// before the error is returned — the persistence itself is best-effort,
    /// per §7: a failure there is logged, not substituted for the original
    /// error.
    ///
    /// # Errors
    ///
    /// Returns whatever error aborted the pipeline.
    pub async fn process(&self, task_id: &str) -> Result<()> {
        match self.process_inner(task_id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.fail_task(task_id, &err).await;
                Err(err)
            }
        }
    }

    async fn process_inner(&self, task_id: &str) -> Result<()> {
        let task = self
            .task_repo
            .get_task_by_id(task_id)
            .await?
            .ok_or_else(|| Error::FileNotFound {
                path: task_id.to_string(),
            })?;
        let file_record = self
            .file_repo
            .get_by_id(task.file_record_id)
            .await?
            .ok_or_else(|| Error::FileNotFound {
                path: task.file_name.clone(),
            })?;

        self.task_repo.update_status(task_id, TaskStatus::Processing, None).await?;

        let remote_path = format!(
            "{}/{}",
            self.settings.input_dir.trim_end_matches('/'),
            file_record.file_name
        );
        let content = self.fetch_remote_file(&remote_path, task_id).await?;

        let declared_encoding = match file_record.encoding {
            Encoding::Utf8 => "utf-8",
            Encoding::Big5 => "big5",
        };
        let detected_encoding = detect(&content, task_id)?;
        if detected_encoding != declared_encoding {
            tracing::warn!(
                task_id,
                declared = declared_encoding,
                detected = detected_encoding,
                "detected encoding differs from the file record's declared encoding"
            );
        }
        let text = decode(&content, declared_encoding, task_id)?;

        let strategy = match file_record.format_type {
            FormatType::Delimited => Strategy::Delimited {
                // `insert_file_record` rejects a delimited record with no
                // delimiter before it ever reaches the database.
                delimiter: file_record.delimiter.clone().unwrap_or_default(),
            },
            FormatType::FixedLength => Strategy::FixedLength,
        };

        let field_defs = self
            .file_repo
            .get_field_definitions_by_file_name(&file_record.file_name)
            .await?;

        let output_path = output_path_for(&self.settings.output_dir, &file_record.file_name);
        let stream = parse_stream(text, field_defs.clone(), strategy);
        let rows = self.writer.write_stream(stream, &output_path, &field_defs)?;
        tracing::info!(task_id, rows, path = %output_path.display(), "columnar output written");

        self.submit_masking_best_effort(task_id, &output_path, &field_defs).await;

        self.task_repo.update_status(task_id, TaskStatus::Completed, None).await?;
        Ok(())
    }

    async fn fetch_remote_file(&self, remote_path: &str, task_id: &str) -> Result<Vec<u8>> {
        let mut session = SftpSession::connect(SftpConfig {
            host: self.settings.sftp_host.clone(),
            port: self.settings.sftp_port,
            username: self.settings.sftp_user.clone(),
            password: self.settings.sftp_password.clone(),
            timeout: DEFAULT_TIMEOUT,
        })
        .await?;

        let content = session.read_file(remote_path, task_id).await;
        session.close().await;
        Ok(content?)
    }

    async fn submit_masking_best_effort(
        &self,
        task_id: &str,
        output_path: &std::path::Path,
        field_defs: &[FieldDefinition],
    ) {
        let masked_path = masked_path_for(output_path);
        let result = self
            .downstream
            .submit_masking_request(
                task_id,
                &output_path.to_string_lossy(),
                &masked_path.to_string_lossy(),
                field_defs,
            )
            .await;

        if let Err(err) = result {
            tracing::warn!(task_id, error = %err, "masking submission failed, task still completes");
        }
    }

    async fn fail_task(&self, task_id: &str, err: &Error) {
        let message = format!("{} ({})", err, err.code());
        if let Err(update_err) = self
            .task_repo
            .update_status(task_id, TaskStatus::Failed, Some(&message))
            .await
        {
            tracing::error!(task_id, error = %update_err, "failed to persist task failure");
        }
    }
}
