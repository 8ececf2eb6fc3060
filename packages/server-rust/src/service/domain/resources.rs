//! Static resources: the API document and pipeline artifacts.
//!
//! Both are read from the local filesystem and bypass the broker and the
//! query service entirely.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::Service;

use crate::service::operation::{ArtifactRef, Operation, OperationError, OperationResponse};

/// Content type of the served API document.
pub const API_SPEC_CONTENT_TYPE: &str = "application/yaml";

// ---------------------------------------------------------------------------
// ResourceConfig
// ---------------------------------------------------------------------------

/// Where static resources live on disk.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// The OpenAPI document served at `/api.yaml`.
    pub api_spec: PathBuf,
    /// Root of the artifact tree, laid out as
    /// `{store}/{group}/{name}/{number}/{artifact}`.
    pub artifacts_dir: PathBuf,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            api_spec: PathBuf::from("bob/api.yaml"),
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

// ---------------------------------------------------------------------------
// StaticResourceService
// ---------------------------------------------------------------------------

/// Handler for `GetApiSpec` and `PipelineArtifactFetch`.
#[derive(Debug, Clone)]
pub struct StaticResourceService {
    config: Arc<ResourceConfig>,
}

impl StaticResourceService {
    #[must_use]
    pub fn new(config: ResourceConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Service<Operation> for StaticResourceService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let config = Arc::clone(&self.config);
        Box::pin(async move {
            match op {
                Operation::GetApiSpec { .. } => api_spec(&config.api_spec).await,
                Operation::PipelineArtifactFetch { artifact, .. } => {
                    open_artifact(&config.artifacts_dir, artifact).await
                }
                other => Err(OperationError::WrongHandler { name: other.name() }),
            }
        })
    }
}

async fn api_spec(path: &Path) -> Result<OperationResponse, OperationError> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("Could not read spec file: {e}"))?;
    Ok(OperationResponse::Document {
        content_type: API_SPEC_CONTENT_TYPE,
        body: Bytes::from(body),
    })
}

async fn open_artifact(
    root: &Path,
    artifact: ArtifactRef,
) -> Result<OperationResponse, OperationError> {
    let path = artifact_path(root, &artifact)?;
    let not_found = || {
        OperationError::NotFound(format!(
            "Cannot locate artifact {} in artifact store {}",
            artifact.artifact, artifact.store
        ))
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(anyhow::anyhow!("Could not open artifact {}: {e}", path.display()).into())
        }
    };
    let metadata = file
        .metadata()
        .await
        .map_err(|e| anyhow::anyhow!("Could not stat artifact {}: {e}", path.display()))?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    Ok(OperationResponse::File {
        file_name: artifact.artifact,
        file,
    })
}

/// Resolves the on-disk location of `artifact` below `root`.
///
/// Every caller-supplied segment must be a single plain path component.
fn artifact_path(root: &Path, artifact: &ArtifactRef) -> Result<PathBuf, OperationError> {
    let ArtifactRef {
        group,
        name,
        number,
        store,
        artifact: file,
    } = artifact;
    for segment in [store, group, name, file] {
        check_segment(segment)?;
    }

    Ok(root
        .join(store)
        .join(group)
        .join(name)
        .join(number.to_string())
        .join(file))
}

fn check_segment(segment: &str) -> Result<(), OperationError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(OperationError::InvalidInput(format!(
            "Invalid path segment: {segment:?}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::OperationContext;

    fn ctx() -> OperationContext {
        OperationContext::new(1, 5000)
    }

    fn artifact(store: &str, artifact: &str) -> ArtifactRef {
        ArtifactRef {
            group: "dev".to_string(),
            name: "test".to_string(),
            number: 1,
            store: store.to_string(),
            artifact: artifact.to_string(),
        }
    }

    fn service(dir: &Path) -> StaticResourceService {
        StaticResourceService::new(ResourceConfig {
            api_spec: dir.join("api.yaml"),
            artifacts_dir: dir.join("artifacts"),
        })
    }

    #[tokio::test]
    async fn serves_api_spec_as_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("api.yaml"), "openapi: 3.0.0\n").unwrap();

        let resp = service(dir.path())
            .oneshot(Operation::GetApiSpec { ctx: ctx() })
            .await
            .unwrap();
        let OperationResponse::Document { content_type, body } = resp else {
            panic!("expected document");
        };
        assert_eq!(content_type, "application/yaml");
        assert_eq!(&body[..], b"openapi: 3.0.0\n");
    }

    #[tokio::test]
    async fn missing_api_spec_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = service(dir.path())
            .oneshot(Operation::GetApiSpec { ctx: ctx() })
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Internal(_)));
        assert!(err.to_string().starts_with("Could not read spec file: "));
    }

    #[tokio::test]
    async fn opens_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("artifacts/local/dev/test/1");
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(run_dir.join("app.jar"), b"jar bytes").unwrap();

        let resp = service(dir.path())
            .oneshot(Operation::PipelineArtifactFetch {
                ctx: ctx(),
                artifact: artifact("local", "app.jar"),
            })
            .await
            .unwrap();
        let OperationResponse::File { file_name, mut file } = resp else {
            panic!("expected file");
        };
        assert_eq!(file_name, "app.jar");
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"jar bytes");
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();

        let err = service(dir.path())
            .oneshot(Operation::PipelineArtifactFetch {
                ctx: ctx(),
                artifact: artifact("local", "app.jar"),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot locate artifact app.jar in artifact store local"
        );
        assert!(matches!(err, OperationError::NotFound(_)));
    }

    #[tokio::test]
    async fn directory_is_not_an_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("artifacts/local/dev/test/1/nested")).unwrap();

        let err = service(dir.path())
            .oneshot(Operation::PipelineArtifactFetch {
                ctx: ctx(),
                artifact: artifact("local", "nested"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_segments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        for (store, name) in [("..", "app.jar"), ("local", ".."), ("local", "a/b"), ("lo\\cal", "x")] {
            let err = service(dir.path())
                .oneshot(Operation::PipelineArtifactFetch {
                    ctx: ctx(),
                    artifact: artifact(store, name),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, OperationError::InvalidInput(_)), "{store}/{name}");
        }
    }

    #[test]
    fn artifact_path_layout() {
        let path = artifact_path(Path::new("/srv/artifacts"), &artifact("s3", "out.tar")).unwrap();
        assert_eq!(path, PathBuf::from("/srv/artifacts/s3/dev/test/1/out.tar"));
    }

    #[test]
    fn resource_config_defaults() {
        let config = ResourceConfig::default();
        assert_eq!(config.api_spec, PathBuf::from("bob/api.yaml"));
        assert_eq!(config.artifacts_dir, PathBuf::from("artifacts"));
    }
}
