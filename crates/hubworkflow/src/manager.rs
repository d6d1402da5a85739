use crate::{ReplayEngine, ReplayReport, Script, Serializer, Snapshot};
use hubcore::{ControlError, Result};
use hubsession::SessionControl;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Save and load workflows for one session, remembering the last file
pub struct WorkflowManager {
    session: Arc<dyn SessionControl>,
    engine: ReplayEngine,
    loaded_file: Option<PathBuf>,
}

impl WorkflowManager {
    pub fn new(session: Arc<dyn SessionControl>) -> Self {
        Self {
            engine: ReplayEngine::new(session.clone()),
            session,
            loaded_file: None,
        }
    }

    pub fn session(&self) -> &Arc<dyn SessionControl> {
        &self.session
    }

    pub fn engine(&self) -> &ReplayEngine {
        &self.engine
    }

    pub fn loaded_file(&self) -> Option<&Path> {
        self.loaded_file.as_deref()
    }

    pub fn set_loaded_file(&mut self, path: Option<PathBuf>) {
        self.loaded_file = path;
    }

    /// Snapshot every running module
    pub async fn capture(&self) -> Result<Snapshot> {
        let running = self.session.running().await;
        Ok(Snapshot::capture(self.session.as_ref(), &running).await?)
    }

    pub async fn script(&self) -> Result<Script> {
        let snapshot = self.capture().await?;
        Ok(Serializer::new(&snapshot).serialize())
    }

    /// Write the running workflow to `path`, or to the last used file.
    ///
    /// The chosen file becomes the loaded file.
    pub async fn save(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let path = self.resolve(path)?;
        self.loaded_file = Some(path.clone());

        let script = self.script().await?;
        tokio::fs::write(&path, script.to_string()).await?;

        info!("Data flow network saved to {}", path.display());
        Ok(path)
    }

    /// Replace the running workflow with the one stored in `path`, or in the
    /// last used file.
    ///
    /// The file is read and validated before anything is killed.
    pub async fn load(&mut self, path: Option<&Path>) -> Result<ReplayReport> {
        let path = self.resolve(path)?;
        let text = tokio::fs::read_to_string(&path).await?;
        let script = Script::parse(&text)?;
        let summary = script.validate()?;

        info!(
            "Loading {}: {} local and {} remote modules",
            path.display(),
            summary.local_spawns,
            summary.remote_spawns
        );
        self.reset().await?;
        let report = self.engine.execute(&script).await?;

        self.loaded_file = Some(path);
        Ok(report)
    }

    /// Kill every running module and forget the loaded file
    pub async fn reset(&mut self) -> Result<usize> {
        let killed = self.engine.reset().await?;
        self.loaded_file = None;
        Ok(killed)
    }

    fn resolve(&self, path: Option<&Path>) -> Result<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(|| self.loaded_file.clone())
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ControlError::NoFileName)
    }
}
