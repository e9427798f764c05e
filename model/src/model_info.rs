use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    game_name: String,
    run_name: String,
    model_num: usize,
}

impl ModelInfo {
    pub fn new(game_name: String, run_name: String, model_num: usize) -> ModelInfo {
        ModelInfo {
            game_name,
            run_name,
            model_num,
        }
    }

    pub fn from_model_name(model_name: &str) -> Result<ModelInfo> {
        let parts: Vec<_> = model_name.split('_').collect();

        if parts.len() != 3 {
            return Err(anyhow!(
                "Model name {} is not of the form <game>_<run>_<num>",
                model_name
            ));
        }

        let model_num = parts[2]
            .parse()
            .map_err(|_| anyhow!("Model number in {} is not a number", model_name))?;

        Ok(ModelInfo {
            game_name: parts[0].to_string(),
            run_name: parts[1].to_string(),
            model_num,
        })
    }

    pub fn get_game_name(&self) -> &str {
        &self.game_name
    }

    pub fn get_run_name(&self) -> &str {
        &self.run_name
    }

    pub fn get_model_num(&self) -> usize {
        self.model_num
    }

    pub fn get_model_name(&self) -> String {
        format!(
            "{}_{}_{:0>5}",
            self.game_name, self.run_name, self.model_num
        )
    }

    pub fn get_next_model_info(&self) -> ModelInfo {
        ModelInfo::new(
            self.game_name.clone(),
            self.run_name.clone(),
            self.model_num + 1,
        )
    }

    pub fn get_checkpoint_path(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(format!("{}.ckpt", self.get_model_name()))
    }
}
