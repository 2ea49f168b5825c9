use std::{
    fs::File,
    future::Future,
    io::BufReader,
    path::{Path, PathBuf},
    pin::Pin,
    time::Duration,
};

use bevy_tasks::{IoTaskPool, Task, TaskPool};
use geojson::{FeatureCollection, GeoJson};
use ureq::Agent;

use crate::error::LoadError;
use crate::types::{LayerPayload, LayerRecord};

/// Upper bound for a single static GeoJSON download.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

pub type LoadFuture<'a> =
    Pin<Box<dyn Future<Output = Result<LayerPayload, LoadError>> + Send + 'a>>;

/// Fetches the data behind a layer's `source_ref`.
///
/// The registry only ever calls this for one in-flight request per layer.
///
/// Any `Fn(&LayerRecord) -> impl Future` closure is a loader too. Its future
/// must be `'static`, so copy what it needs out of the record first:
///
/// ```ignore
/// let loader = |record: &LayerRecord| {
///     let source_ref = record.source_ref().to_string();
///     async move { fetch(&source_ref).await }
/// };
/// ```
pub trait LayerLoader: Send + Sync {
    fn load<'a>(&'a self, record: &'a LayerRecord) -> LoadFuture<'a>;
}

impl<F, Fut> LayerLoader for F
where
    F: Fn(&LayerRecord) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LayerPayload, LoadError>> + Send + 'static,
{
    fn load<'a>(&'a self, record: &'a LayerRecord) -> LoadFuture<'a> {
        Box::pin(self(record))
    }
}

/// Reads layers from GeoJSON files under a root directory.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, source_ref: &str) -> PathBuf {
        self.root.join(source_ref.trim_start_matches('/'))
    }
}

impl LayerLoader for FileLoader {
    fn load<'a>(&'a self, record: &'a LayerRecord) -> LoadFuture<'a> {
        let path = self.path_for(record.source_ref());
        let source_ref = record.source_ref().to_string();
        Box::pin(spawn_blocking(move || read_geojson_file(&path, &source_ref)))
    }
}

/// Fetches layers as static files with a plain GET.
///
/// The request runs on the IO task pool; the returned future waits for it.
#[derive(Clone)]
pub struct HttpLoader {
    base_url: String,
    agent: Agent,
}

impl HttpLoader {
    pub fn new(base_url: &str) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        let agent: Agent = config.into();
        HttpLoader {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn url_for(&self, source_ref: &str) -> String {
        format!("{}/{}", self.base_url, source_ref.trim_start_matches('/'))
    }

    fn fetch(&self, source_ref: &str) -> Result<LayerPayload, LoadError> {
        let url = self.url_for(source_ref);
        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|source| LoadError::Http { url: url.clone(), source })?;
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(|source| LoadError::Http { url: url.clone(), source })?;
        parse_geojson_str(&body, source_ref)
    }
}

impl std::fmt::Debug for HttpLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLoader").field("base_url", &self.base_url).finish()
    }
}

impl LayerLoader for HttpLoader {
    fn load<'a>(&'a self, record: &'a LayerRecord) -> LoadFuture<'a> {
        let loader = self.clone();
        let source_ref = record.source_ref().to_string();
        Box::pin(spawn_blocking(move || loader.fetch(&source_ref)))
    }
}

/// Runs blocking work on the shared IO task pool.
///
/// The pool is created on first use when no host application has set it up.
pub fn spawn_blocking<T, F>(work: F) -> Task<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    IoTaskPool::get_or_init(TaskPool::new).spawn(async move { work() })
}

/// Opens and parses a GeoJSON file into a payload.
pub fn read_geojson_file(path: &Path, source_ref: &str) -> Result<LayerPayload, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader).map_err(|source| LoadError::Parse {
        source_ref: source_ref.to_string(),
        source: geojson::Error::MalformedJson(source),
    })?;
    into_payload(geojson, source_ref)
}

pub fn parse_geojson_str(data: &str, source_ref: &str) -> Result<LayerPayload, LoadError> {
    let geojson = data.parse::<GeoJson>().map_err(|source| LoadError::Parse {
        source_ref: source_ref.to_string(),
        source,
    })?;
    into_payload(geojson, source_ref)
}

fn into_payload(geojson: GeoJson, source_ref: &str) -> Result<LayerPayload, LoadError> {
    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(payload_from_collection(collection)),
        _ => Err(LoadError::NotFeatureCollection {
            source_ref: source_ref.to_string(),
        }),
    }
}

/// Lifts the optional `tableRows`, `summaryStats` and `legendEntries` members
/// off the collection; everything else stays on the geometry.
fn payload_from_collection(mut collection: FeatureCollection) -> LayerPayload {
    let (mut table_rows, mut summary_stats, mut legend_entries) = (None, None, None);
    if let Some(members) = collection.foreign_members.as_mut() {
        table_rows = members.remove("tableRows");
        summary_stats = members.remove("summaryStats");
        legend_entries = members.remove("legendEntries");
        if members.is_empty() {
            collection.foreign_members = None;
        }
    }
    LayerPayload {
        geometry: collection,
        table_rows,
        summary_stats,
        legend_entries,
    }
}
