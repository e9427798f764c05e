use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tch::{TchError, Tensor};
use thiserror::Error;

use super::architecture::{ArchitectureError, ArchitectureSpec};
use super::network::Network;

const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported checkpoint version {0}, expected {FORMAT_VERSION}")]
    UnsupportedVersion(u32),

    #[error("invalid checkpoint metadata")]
    Header(#[from] serde_json::Error),

    #[error("invalid architecture in checkpoint metadata")]
    Architecture(#[from] ArchitectureError),

    #[error("unreadable checkpoint tensors")]
    Torch(#[from] TchError),

    #[error("checkpoint is missing tensor {0}")]
    MissingTensor(String),

    #[error("checkpoint has unexpected tensor {0}")]
    UnexpectedTensor(String),

    #[error("tensor {name} has shape {found:?} in the checkpoint, expected {expected:?}")]
    TensorShape {
        name: String,
        expected: Vec<i64>,
        found: Vec<i64>,
    },
}

/// Written next to the tensors so a network can be rebuilt without any configuration.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointMetadata {
    format_version: u32,
    architecture: ArchitectureSpec,
    batch_num: u64,
}

/// Path of the JSON metadata stored alongside the tensors at `path`.
pub fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

/// Saves every variable of `network`, running statistics included, with [`tch::nn::VarStore::save`]
/// and the architecture and batch number as JSON next to it.
pub fn save(path: &Path, network: &Network, batch_num: u64) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    network.var_store().save(path)?;

    let metadata = CheckpointMetadata {
        format_version: FORMAT_VERSION,
        architecture: network.spec().clone(),
        batch_num,
    };
    let mut file = File::create(metadata_path(path))?;
    writeln!(file, "{}", serde_json::to_string(&metadata)?)?;

    info!("Saved checkpoint at batch {} to {:?}", batch_num, path);

    Ok(())
}

/// Builds a network from the architecture recorded with the checkpoint and restores its tensors.
pub fn load(path: &Path) -> Result<(Network, u64), CheckpointError> {
    let metadata = read_metadata(path)?;

    metadata.architecture.validate()?;
    let mut network = Network::allocate(&metadata.architecture, 0);
    load_tensors(path, &mut network)?;

    info!(
        "Loaded checkpoint at batch {} from {:?}",
        metadata.batch_num, path
    );

    Ok((network, metadata.batch_num))
}

/// Overwrites the tensors of an existing network. Every tensor must be present with the same shape.
pub fn restore(path: &Path, network: &mut Network) -> Result<u64, CheckpointError> {
    let metadata = read_metadata(path)?;

    if &metadata.architecture != network.spec() {
        warn!(
            "Architecture recorded in {:?} differs from the configured one, restoring by tensor name",
            path
        );
    }

    load_tensors(path, network)?;

    info!(
        "Restored checkpoint at batch {} from {:?}",
        metadata.batch_num, path
    );

    Ok(metadata.batch_num)
}

fn read_metadata(path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    let file = File::open(metadata_path(path))?;
    let metadata: CheckpointMetadata = serde_json::from_reader(BufReader::new(file))?;

    if metadata.format_version != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion(metadata.format_version));
    }

    Ok(metadata)
}

fn load_tensors(path: &Path, network: &mut Network) -> Result<(), CheckpointError> {
    let stored = Tensor::load_multi(path)?
        .into_iter()
        .map(|(name, tensor)| (name, tensor.size()))
        .collect::<HashMap<_, _>>();
    let expected = network
        .variables()
        .into_iter()
        .map(|(name, tensor)| (name, tensor.size()))
        .collect::<HashMap<_, _>>();

    check_shapes(&expected, &stored)?;
    network.var_store_mut().load(path)?;

    Ok(())
}

fn check_shapes(
    expected: &HashMap<String, Vec<i64>>,
    found: &HashMap<String, Vec<i64>>,
) -> Result<(), CheckpointError> {
    let mut names = expected.keys().collect::<Vec<_>>();
    names.sort();

    for name in names {
        match found.get(name) {
            None => return Err(CheckpointError::MissingTensor(name.clone())),
            Some(shape) if shape != &expected[name] => {
                return Err(CheckpointError::TensorShape {
                    name: name.clone(),
                    expected: expected[name].clone(),
                    found: shape.clone(),
                })
            }
            Some(_) => {}
        }
    }

    if let Some(extra) = found.keys().find(|name| !expected.contains_key(*name)) {
        return Err(CheckpointError::UnexpectedTensor(extra.clone()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Mode;
    use ndarray::Array4;

    fn spec(filters: usize) -> ArchitectureSpec {
        ArchitectureSpec::builder(3)
            .num_filters(filters)
            .num_blocks(1)
            .value_hidden(4, 1)
            .build()
    }

    /// A network whose running statistics have moved away from their initial values.
    fn trained_network() -> Network {
        let network = Network::build(&spec(4), 5).unwrap();
        let input = Array4::from_shape_fn((2, 3, 3, 3), |(b, y, x, c)| {
            ((b + y * 3 + x + c) % 3) as f32 - 1.0
        });
        network.forward(input.view(), Mode::Train).unwrap();
        network
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.ckpt");
        let network = trained_network();

        save(&path, &network, 17).unwrap();
        let (loaded, batch_num) = load(&path).unwrap();

        assert_eq!(batch_num, 17);
        assert!(metadata_path(&path).exists());
        assert_eq!(loaded.spec(), network.spec());

        let original = network.variables();
        let restored = loaded.variables();
        assert_eq!(original.len(), restored.len());
        for (name, value) in &original {
            assert!(value.equal(&restored[name]), "{} differs", name);
        }
    }

    #[test]
    fn test_restore_rejects_mismatched_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");
        save(&path, &trained_network(), 1).unwrap();

        let mut wider = Network::build(&spec(8), 0).unwrap();

        assert!(matches!(
            restore(&path, &mut wider),
            Err(CheckpointError::TensorShape { .. })
        ));
    }

    #[test]
    fn test_restore_rejects_missing_tensors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");
        save(&path, &trained_network(), 1).unwrap();

        let deeper = ArchitectureSpec::builder(3)
            .num_filters(4)
            .num_blocks(2)
            .value_hidden(4, 1)
            .build();
        let mut network = Network::build(&deeper, 0).unwrap();

        match restore(&path, &mut network) {
            Err(CheckpointError::MissingTensor(name)) => assert!(name.starts_with("res1.")),
            other => panic!("Expected a missing tensor, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rejects_unexpected_tensors() {
        let expected = HashMap::from([("a".to_string(), vec![2])]);
        let found = HashMap::from([("a".to_string(), vec![2]), ("b".to_string(), vec![1])]);

        assert!(matches!(
            check_shapes(&expected, &found),
            Err(CheckpointError::UnexpectedTensor(name)) if name == "b"
        ));
    }

    #[test]
    fn test_rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");
        save(&path, &trained_network(), 1).unwrap();

        fs::write(&path, b"definitely not a checkpoint").unwrap();
        assert!(matches!(load(&path), Err(CheckpointError::Torch(_))));

        assert!(matches!(
            load(&dir.path().join("missing.ckpt")),
            Err(CheckpointError::Io(_))
        ));
    }

    #[test]
    fn test_rejects_corrupt_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");
        save(&path, &trained_network(), 1).unwrap();
        let metadata = fs::read_to_string(metadata_path(&path)).unwrap();

        fs::write(metadata_path(&path), &metadata[..metadata.len() / 2]).unwrap();
        assert!(matches!(load(&path), Err(CheckpointError::Header(_))));

        let newer = metadata.replace(
            &format!("\"format_version\":{}", FORMAT_VERSION),
            "\"format_version\":99",
        );
        fs::write(metadata_path(&path), newer).unwrap();
        assert!(matches!(
            load(&path),
            Err(CheckpointError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_rejects_oversized_length_claims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");
        save(&path, &trained_network(), 1).unwrap();

        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend_from_slice(&[0xff; 60]);
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(load(&path), Err(CheckpointError::Torch(_))));
    }

    #[test]
    fn test_rejects_truncated_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");
        save(&path, &trained_network(), 1).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 16]).unwrap();

        assert!(matches!(load(&path), Err(CheckpointError::Torch(_))));
    }
}
