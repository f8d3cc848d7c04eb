mod gltf_import;

pub use gltf_import::{decode_gltf, ImportedModel};
#[cfg(test)]
pub(crate) use gltf_import::tests::QUAD_GLTF;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

const READ_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("glTF document has no scene")]
    NoScene,
    #[error("mesh '{mesh}' has a primitive without positions")]
    MissingPositions { mesh: String },
    #[error("failed to start loader thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("loader stopped before finishing {path}")]
    LoaderStopped { path: String },
}

/// Byte progress of an in-flight load. `total` is zero when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Loaded(ImportedModel),
    Failed(AssetError),
}

impl LoadEvent {
    fn is_terminal(&self) -> bool {
        !matches!(self, LoadEvent::Progress(_))
    }
}

/// One asynchronous model load. Work happens on a background thread; events
/// are handed to the caller's loop through [`AssetLoader::poll`].
pub struct AssetLoader {
    path: PathBuf,
    receiver: Receiver<LoadEvent>,
    finished: bool,
}

impl AssetLoader {
    pub fn spawn(path: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel();
        let thread_path = path.clone();
        let thread_sender = sender.clone();
        let spawned = std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let event = match load_model(&thread_path, &thread_sender) {
                    Ok(model) => LoadEvent::Loaded(model),
                    Err(err) => LoadEvent::Failed(err),
                };
                let _ = thread_sender.send(event);
            });
        if let Err(err) = spawned {
            let _ = sender.send(LoadEvent::Failed(AssetError::Spawn(err)));
        }
        log::info!("Loading model {}", path.display());
        Self {
            path,
            receiver,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drains pending events without blocking. After the terminal event
    /// (success or failure) nothing further is returned.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while !self.finished {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.finished = event.is_terminal();
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    events.push(LoadEvent::Failed(AssetError::LoaderStopped {
                        path: self.path.display().to_string(),
                    }));
                }
            }
        }
        events
    }
}

fn load_model(path: &Path, progress: &Sender<LoadEvent>) -> Result<ImportedModel, AssetError> {
    let read_error = |source| AssetError::Read {
        path: path.display().to_string(),
        source,
    };
    let mut file = File::open(path).map_err(read_error)?;
    let total = file.metadata().map(|meta| meta.len()).unwrap_or(0);
    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let read = file.read(&mut chunk).map_err(read_error)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        let _ = progress.send(LoadEvent::Progress(LoadProgress {
            loaded: bytes.len() as u64,
            total,
        }));
    }
    decode_gltf(&bytes, path.parent())
}
