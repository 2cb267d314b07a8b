use blanket::blanket;
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;

use directories::BaseDirs;
use which::{which, which_in};

use crate::config::Config;
use crate::utils::ensure_dir_exists;
use crate::Error;

use std::ops::DerefMut;
use std::sync::Mutex;

#[derive(Clone)]
struct CachedBin {
    name: String,
    path: String,
}

fn wrapped_which(bin: &str) -> Option<PathBuf> {
    if let Ok(ttu_path) = env::var("TTU_PATH") {
        let cwd = env::current_dir().ok()?;
        return which_in(bin, Some(&ttu_path), &cwd).ok();
    }
    which(bin).ok()
}

fn find_program(prog: &str) -> Option<String> {
    wrapped_which(prog).map(|it| it.to_string_lossy().into())
}

/// Context is a trait for an object that can help standardize file locations,
/// find binaries, and lookup env vars.
///
/// Most methods on this trait have a default implementation that is perfectly
/// safe to leave unchanged.
#[blanket(derive(Ref, Box))]
pub trait Context: Send + Sync {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        find_program(bin)
    }

    fn has_bin(&self, bin: &str) -> bool {
        self.maybe_get_bin(bin).is_some()
    }

    fn get_bin(&self, bin: &str) -> crate::Result<String> {
        self.maybe_get_bin(bin)
            .ok_or_else(|| Error::MissingBin(bin.into()))
    }

    fn has_env(&self, key: &str) -> bool {
        self.maybe_get_env(key).is_some()
    }

    fn get_env(&self, key: &str) -> crate::Result<String> {
        self.maybe_get_env(key)
            .ok_or_else(|| Error::MissingEnv(key.into()))
    }

    fn get_project_dir(&self) -> crate::Result<PathBuf> {
        let home = self
            .get_env("TTU_PROJECT_HOME")
            .map(|env| PathBuf::new().join(env))?;
        if !home.exists() {
            return Err(Error::Generic(format!(
                "TTU_PROJECT_HOME set to {}, but that directory doesn't exist",
                home.to_str().expect("valid paths")
            )));
        }
        Ok(home)
    }

    fn get_project_config_file(&self) -> crate::Result<PathBuf> {
        self.get_project_dir_child("ttu.toml")
    }

    fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>>;

    fn get_project_dir_child(&self, child: &str) -> crate::Result<PathBuf> {
        self.get_project_dir().map(|x| x.join(child))
    }

    fn get_output_dir(&self) -> crate::Result<PathBuf> {
        self.get_project_dir_child("ttu_out")
    }

    fn get_output_dir_child(&self, child: &str) -> crate::Result<PathBuf> {
        self.get_output_dir().map(|x| x.join(child))
    }

    /// The directory recorded traces are read from
    fn get_traces_dir(&self) -> crate::Result<PathBuf> {
        self.get_project_dir_child("traces")
    }

    /// The root of the committed golden tree
    fn get_goldens_dir(&self) -> crate::Result<PathBuf> {
        self.get_project_dir_child("goldens")
    }

    /// Get a cache dir relative to the project instead of the user's cache dir
    fn get_project_cache_dir(&self) -> crate::Result<PathBuf> {
        let cache = self.get_output_dir_child("cache")?;
        ensure_dir_exists(&cache)?;
        Ok(cache)
    }

    fn get_cache_dir(&self) -> crate::Result<PathBuf> {
        let dir = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        let cache = dir.cache_dir().to_path_buf().join("ttu");
        ensure_dir_exists(&cache)?;
        Ok(cache)
    }

    fn get_user_local_dir(&self) -> crate::Result<PathBuf> {
        let bd = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        Ok(bd.data_local_dir().join("ttu"))
    }

    fn get_user_config_dir(&self) -> crate::Result<PathBuf> {
        let bd = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        Ok(bd.config_dir().join("ttu"))
    }
}

pub struct DefaultContext {
    bin_cache: Mutex<Vec<CachedBin>>,
    project_config: OnceCell<Option<Config>>,
}

impl Clone for DefaultContext {
    fn clone(&self) -> Self {
        let cache = self.bin_cache.lock().expect("failed to lock");
        let project_config = self.project_config.clone();
        Self {
            bin_cache: Mutex::new(cache.clone()),
            project_config,
        }
    }
}

impl DefaultContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DefaultContext {
    fn default() -> Self {
        Self {
            bin_cache: Mutex::new(Vec::new()),
            project_config: OnceCell::new(),
        }
    }
}

impl Context for DefaultContext {
    fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>> {
        let cfg = self
            .project_config
            .get_or_try_init(|| -> crate::Result<Option<Config>> {
                let path = self.get_project_config_file()?;
                if !path.exists() {
                    Ok(None)
                } else {
                    Ok(Some(Config::parse(&path)?))
                }
            })?;
        Ok(cfg.as_ref())
    }

    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, prog: &str) -> Option<String> {
        let mut cache_guard = self.bin_cache.lock().expect("failed to lock");
        let cache = cache_guard.deref_mut();
        for val in cache.iter() {
            if val.name == prog {
                return Some(val.path.clone());
            }
        }

        let found = find_program(prog)?;

        cache.push(CachedBin {
            name: prog.into(),
            path: found.clone(),
        });

        Some(found)
    }
}
