use crate::{PageSummary, PdfCommand, PdfUpdate, RuntimeError, SkippedSummary};
use pdf_organize::{AssemblyOptions, Ingestor, Session, load_upload, save_pdf};
use std::path::PathBuf;
use tokio::sync::mpsc;

type Result<T> = std::result::Result<T, RuntimeError>;

/// Async worker task that owns one session and processes commands in
/// arrival order. Returns when the command channel closes or nobody is
/// listening for updates any more.
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
) {
    let mut session = Session::new();

    while let Some(cmd) = command_rx.recv().await {
        match process_command(cmd, &mut session, &update_tx).await {
            Ok(()) => {}
            Err(RuntimeError::UpdatesClosed) => {
                log::debug!("Update receiver dropped, stopping worker");
                break;
            }
            Err(RuntimeError::Organize(e)) => {
                if send(&update_tx, PdfUpdate::Error { message: e.to_string() }).is_err() {
                    break;
                }
            }
        }
    }
}

async fn process_command(
    cmd: PdfCommand,
    session: &mut Session,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<()> {
    match cmd {
        PdfCommand::IngestFiles { paths } => {
            handle_ingest(paths, session, update_tx).await?;
            send_pages(session, update_tx)
        }
        PdfCommand::Reorder { page, target_index } => {
            session.reorder(page, target_index);
            send_pages(session, update_tx)
        }
        PdfCommand::Rotate { page } => {
            session.rotate(page);
            send_pages(session, update_tx)
        }
        PdfCommand::RemovePage { page } => {
            session.remove_page(page);
            send_pages(session, update_tx)
        }
        PdfCommand::RemoveFile { source } => {
            session.remove_file(source);
            send_pages(session, update_tx)
        }
        PdfCommand::Assemble {
            options,
            output_path,
        } => handle_assemble(options, output_path, session, update_tx).await,
        PdfCommand::ListPages => send_pages(session, update_tx),
    }
}

async fn handle_ingest(
    paths: Vec<PathBuf>,
    session: &mut Session,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<()> {
    let mut ingested_count = 0;
    let mut failed_count = 0;

    for path in paths {
        let display_name = path.display().to_string();
        let outcome = match load_upload(&path).await {
            Ok(upload) => {
                let name = upload.name.clone();
                let progress_tx = update_tx.clone();
                tokio::task::spawn_blocking(move || {
                    Ingestor::new().ingest(upload, |current, total| {
                        let _ = progress_tx.send(PdfUpdate::Progress {
                            operation: format!("Ingesting {}", name),
                            current,
                            total,
                        });
                    })
                })
                .await
                .map_err(pdf_organize::OrganizeError::from)
                .and_then(|result| result)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(ingested) => {
                let source = ingested.source.id();
                let name = ingested.source.name().to_string();
                let page_count = ingested.pages.len();
                session.add(ingested);
                ingested_count += 1;
                send(
                    update_tx,
                    PdfUpdate::FileIngested {
                        source,
                        name,
                        page_count,
                    },
                )?;
            }
            Err(e) => {
                log::warn!("Failed to ingest {}: {}", display_name, e);
                failed_count += 1;
                send(
                    update_tx,
                    PdfUpdate::IngestFailed {
                        name: display_name,
                        message: e.to_string(),
                    },
                )?;
            }
        }
    }

    send(
        update_tx,
        PdfUpdate::IngestFinished {
            ingested: ingested_count,
            failed: failed_count,
        },
    )
}

async fn handle_assemble(
    options: AssemblyOptions,
    output_path: PathBuf,
    session: &Session,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<()> {
    // Later commands wait in the channel, so this snapshot is what gets written
    let snapshot = session.pages().snapshot();
    let assembly = pdf_organize::assemble(snapshot, options).await?;
    save_pdf(&assembly.bytes, &output_path).await?;
    log::info!("Wrote {}", output_path.display());

    let skipped = assembly
        .skipped
        .iter()
        .map(|s| SkippedSummary {
            page: s.page,
            file_name: s.file_name.clone(),
            reason: s.error.to_string(),
        })
        .collect();

    send(
        update_tx,
        PdfUpdate::AssemblyComplete {
            path: output_path,
            page_count: assembly.page_count,
            skipped,
        },
    )
}

fn send_pages(session: &Session, update_tx: &mpsc::UnboundedSender<PdfUpdate>) -> Result<()> {
    let pages = session.pages().iter().map(PageSummary::from).collect();
    send(update_tx, PdfUpdate::PagesChanged { pages })
}

fn send(update_tx: &mpsc::UnboundedSender<PdfUpdate>, update: PdfUpdate) -> Result<()> {
    update_tx
        .send(update)
        .map_err(|_| RuntimeError::UpdatesClosed)
}
