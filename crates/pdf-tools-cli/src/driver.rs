//! Talks to the worker task on behalf of one CLI invocation

use anyhow::{Result, bail};
use pdf_async_runtime::{
    AssemblyOptions, PageSummary, PdfCommand, PdfUpdate, SkippedSummary, worker_task,
};
use std::path::PathBuf;
use tokio::sync::mpsc;

pub struct Outcome {
    pub page_count: usize,
    pub skipped: Vec<SkippedSummary>,
}

pub struct WorkerClient {
    commands: mpsc::UnboundedSender<PdfCommand>,
    updates: mpsc::UnboundedReceiver<PdfUpdate>,
    worker: tokio::task::JoinHandle<()>,
}

impl WorkerClient {
    pub fn spawn() -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (update_tx, updates) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker_task(command_rx, update_tx));
        Self {
            commands,
            updates,
            worker,
        }
    }

    fn send(&self, cmd: PdfCommand) -> Result<()> {
        if self.commands.send(cmd).is_err() {
            bail!("worker stopped unexpectedly");
        }
        Ok(())
    }

    async fn next_update(&mut self) -> Result<PdfUpdate> {
        match self.updates.recv().await {
            Some(update) => Ok(update),
            None => bail!("worker stopped unexpectedly"),
        }
    }

    /// Ingest files in order; returns the resulting page list.
    /// Files that fail are reported on stderr and left out.
    pub async fn ingest(&mut self, paths: Vec<PathBuf>) -> Result<Vec<PageSummary>> {
        self.send(PdfCommand::IngestFiles { paths })?;
        loop {
            match self.next_update().await? {
                PdfUpdate::Progress {
                    operation,
                    current,
                    total,
                } => log::debug!("{}: {}/{}", operation, current, total),
                PdfUpdate::FileIngested {
                    name, page_count, ..
                } => log::info!("Loaded {} ({} page(s))", name, page_count),
                PdfUpdate::IngestFailed { name, message } => {
                    eprintln!("Skipped {}: {}", name, message);
                }
                PdfUpdate::PagesChanged { pages } => return Ok(pages),
                PdfUpdate::Error { message } => bail!(message),
                _ => {}
            }
        }
    }

    /// Send an editing command and wait for the page list it produces
    pub async fn edit(&mut self, cmd: PdfCommand) -> Result<Vec<PageSummary>> {
        self.send(cmd)?;
        loop {
            match self.next_update().await? {
                PdfUpdate::PagesChanged { pages } => return Ok(pages),
                PdfUpdate::Error { message } => bail!(message),
                _ => {}
            }
        }
    }

    pub async fn assemble(
        &mut self,
        options: AssemblyOptions,
        output_path: PathBuf,
    ) -> Result<Outcome> {
        self.send(PdfCommand::Assemble {
            options,
            output_path,
        })?;
        loop {
            match self.next_update().await? {
                PdfUpdate::AssemblyComplete {
                    page_count,
                    skipped,
                    ..
                } => {
                    return Ok(Outcome {
                        page_count,
                        skipped,
                    });
                }
                PdfUpdate::Error { message } => bail!(message),
                _ => {}
            }
        }
    }

    pub async fn shutdown(self) -> Result<()> {
        drop(self.commands);
        self.worker.await?;
        Ok(())
    }
}
