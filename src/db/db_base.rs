//! JSON-file-backed stores: a row store for structs and a string key/value
//! store for the agent's memory slot.

use crate::agent::HasId;
use serde_json;
use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// The memory surface the agent writes its snapshot through.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), Box<dyn std::error::Error>>;
}

#[derive(Clone)]
pub struct JsonFileDb<T>
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de> + Clone,
{
    db: Arc<Mutex<BaseJsonFileDb<Vec<T>>>>,
}

impl<T> JsonFileDb<T>
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de> + Clone,
{
    pub fn new(file_path: String) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(JsonFileDb::<T> {
            db: Arc::new(Mutex::new(BaseJsonFileDb::<Vec<T>>::new(file_path)?)),
        })
    }

    pub fn save(&self, data: Vec<T>) -> Result<(), Box<dyn std::error::Error>> {
        let mut mutex = self.db.lock().unwrap();
        mutex.data = data;
        mutex.save()
    }

    pub fn data(&self) -> Vec<T> {
        let mutex = self.db.lock().unwrap();
        mutex.data.clone()
    }

    pub fn is_data_empty(&self) -> bool {
        let mutex = self.db.lock().unwrap();
        mutex.data.is_empty()
    }
}

impl<T> JsonFileDb<T>
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de> + Clone + HasId,
{
    pub fn next_id(&self) -> u64 {
        let mutex = self.db.lock().unwrap();
        mutex.data.iter().map(HasId::id).max().unwrap_or(0) + 1
    }

    pub fn push(&self, item: T) -> Result<(), Box<dyn std::error::Error>> {
        let mut mutex = self.db.lock().unwrap();
        debug!(
            "Append {} with id {}",
            std::any::type_name::<T>(),
            &item.id()
        );
        mutex.data.push(item);
        mutex.save()
    }
}

#[derive(Clone)]
pub struct KeyValueFileDb {
    db: Arc<Mutex<BaseJsonFileDb<HashMap<String, String>>>>,
}

impl KeyValueFileDb {
    pub fn new(file_path: String) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(KeyValueFileDb {
            db: Arc::new(Mutex::new(BaseJsonFileDb::new(file_path)?)),
        })
    }
}

impl KeyValueStore for KeyValueFileDb {
    fn get(&self, key: &str) -> Option<String> {
        let mutex = self.db.lock().unwrap();
        mutex.data.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), Box<dyn std::error::Error>> {
        let mut mutex = self.db.lock().unwrap();
        mutex.data.insert(key.to_string(), value);
        mutex.save()
    }
}

struct BaseJsonFileDb<D>
where
    D: serde::Serialize + for<'de> serde::Deserialize<'de> + Default,
{
    file_path: String,
    data: D,
}

impl<D> BaseJsonFileDb<D>
where
    D: serde::Serialize + for<'de> serde::Deserialize<'de> + Default,
{
    fn new(file_path: String) -> Result<Self, Box<dyn std::error::Error>> {
        let path = Path::new(&file_path);

        let content = if path.exists() {
            fs::read_to_string(path)?
        } else {
            if let Some(folder) = path.parent() {
                if !folder.as_os_str().is_empty() && !folder.exists() {
                    fs::create_dir_all(folder)?;
                    info!("Created folder: {}", folder.display());
                }
            }
            File::create(path)?;
            info!("Created file: {}", file_path);
            String::new()
        };

        let data: D = if content.is_empty() {
            D::default()
        } else {
            serde_json::from_str(&content)?
        };

        Ok(BaseJsonFileDb::<D> { file_path, data })
    }

    fn save(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(&self.data)?;

        let tmp_path = format!("{}.tmp", &self.file_path);
        let mut file = File::create(&tmp_path)?; // this truncates the existing file if any
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &self.file_path)?; // this replaces the existing file

        debug!("Saved file: {}", self.file_path);

        Ok(())
    }
}
