//! OSM PBF source decoded on a worker thread behind a bounded channel.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use geoenrich_core::{EntityKind, Tags, lat_lon};
use log::debug;
use osmpbf::{BlobDecode, BlobReader, Element, PrimitiveBlock, RelMemberType};

use super::{EntitySource, SourceError};
use crate::entity::{Entity, EntityFilter, MemberKind, Node, Relation, RelationMember, Way};
use crate::tags::collect_tags;

const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

type Item = Result<Entity, SourceError>;

/// Entity source backed by an `.osm.pbf` file.
///
/// Each [`scan`](EntitySource::scan) reopens the file and decodes it on a
/// dedicated thread. Decoded entities pass through a bounded channel, so a
/// slow consumer applies back-pressure to the decoder rather than letting
/// entities pile up in memory.
///
/// # Examples
/// ```no_run
/// use geoenrich_core::EntityKind;
/// use geoenrich_data::{EntityFilter, EntitySource, PbfSource};
///
/// # fn main() -> Result<(), geoenrich_data::SourceError> {
/// let source = PbfSource::open("norway-latest.osm.pbf")?;
/// let relations = source.scan(&EntityFilter::only(EntityKind::Relation))?.count();
/// println!("{relations} relations");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PbfSource {
    path: PathBuf,
    channel_capacity: usize,
}

impl PbfSource {
    /// Open `path`, failing early when it is missing or not PBF data.
    ///
    /// Only the first blob is read here and it must decode to an `OSMHeader`.
    /// Later corruption surfaces as [`SourceError::Decode`] items during a
    /// scan.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = open_reader(&path)?;
        let blob = match reader.next() {
            Some(Ok(blob)) => blob,
            Some(Err(source)) => return Err(SourceError::Decode { source, path }),
            None => return Err(SourceError::NotPbf { path }),
        };
        match blob.decode() {
            Ok(BlobDecode::OsmHeader(_)) => {}
            Ok(_) => return Err(SourceError::NotPbf { path }),
            Err(source) => return Err(SourceError::Decode { source, path }),
        }
        Ok(Self {
            path,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    /// Set how many decoded entities may wait in the channel; at least one.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// File this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntitySource for PbfSource {
    type Stream = PbfStream;

    fn scan(&self, filter: &EntityFilter) -> Result<PbfStream, SourceError> {
        let reader = open_reader(&self.path)?;
        let (sender, receiver) = mpsc::sync_channel(self.channel_capacity);
        let filter = filter.clone();
        let path = self.path.clone();
        let worker = thread::Builder::new()
            .name("geoenrich-pbf".to_owned())
            .spawn(move || decode_blobs(reader, &filter, &sender, &path))
            .map_err(|source| SourceError::Spawn {
                source,
                path: self.path.clone(),
            })?;
        Ok(PbfStream {
            receiver,
            worker: Some(worker),
            path: self.path.clone(),
        })
    }
}

/// Receiving half of a [`PbfSource`] scan.
///
/// The stream ends when the decoder closes the channel. Dropping the stream
/// early makes the decoder stop at its next send.
#[derive(Debug)]
pub struct PbfStream {
    receiver: Receiver<Item>,
    worker: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl Iterator for PbfStream {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        if let Ok(item) = self.receiver.recv() {
            return Some(item);
        }
        let worker = self.worker.take()?;
        worker.join().err().map(|_| {
            Err(SourceError::WorkerPanicked {
                path: self.path.clone(),
            })
        })
    }
}

fn open_reader(path: &Path) -> Result<BlobReader<BufReader<File>>, SourceError> {
    BlobReader::from_path(path).map_err(|source| SourceError::Open {
        source,
        path: path.to_path_buf(),
    })
}

fn decode_blobs(
    reader: BlobReader<BufReader<File>>,
    filter: &EntityFilter,
    sender: &SyncSender<Item>,
    path: &Path,
) {
    for blob in reader {
        let block = match blob.and_then(|blob| data_block(&blob)) {
            Ok(Some(block)) => block,
            Ok(None) => continue,
            Err(source) => {
                let error = SourceError::Decode {
                    source,
                    path: path.to_path_buf(),
                };
                if sender.send(Err(error)).is_err() {
                    debug!("consumer hung up before a decode error was delivered");
                }
                return;
            }
        };
        for entity in block.elements().filter_map(|element| convert(element, filter)) {
            if filter.accepts(&entity) && sender.send(Ok(entity)).is_err() {
                debug!("consumer hung up; stopping decoder for {}", path.display());
                return;
            }
        }
    }
}

fn data_block(blob: &osmpbf::Blob) -> Result<Option<PrimitiveBlock>, osmpbf::Error> {
    Ok(match blob.decode()? {
        BlobDecode::OsmData(block) => Some(block),
        _ => None,
    })
}

/// Convert an element the filter wants by kind; everything else is skipped
/// before any allocation.
fn convert(element: Element<'_>, filter: &EntityFilter) -> Option<Entity> {
    let with_tags = filter.wants_tags();
    match element {
        Element::Node(node) if filter.wants(EntityKind::Node) => Some(Entity::Node(Node {
            id: node.id(),
            location: lat_lon(node.lat(), node.lon()),
            tags: owned_tags(node.tags(), with_tags),
        })),
        Element::DenseNode(node) if filter.wants(EntityKind::Node) => Some(Entity::Node(Node {
            id: node.id(),
            location: lat_lon(node.lat(), node.lon()),
            tags: owned_tags(node.tags(), with_tags),
        })),
        Element::Way(way) if filter.wants(EntityKind::Way) => Some(Entity::Way(Way {
            id: way.id(),
            node_ids: way.refs().collect(),
            tags: owned_tags(way.tags(), with_tags),
        })),
        Element::Relation(relation) if filter.wants(EntityKind::Relation) => {
            let members = relation
                .members()
                .map(|member| RelationMember {
                    kind: member_kind(&member.member_type),
                    id: member.member_id,
                    role: member.role().unwrap_or_default().to_owned(),
                })
                .collect();
            Some(Entity::Relation(Relation {
                id: relation.id(),
                members,
                tags: owned_tags(relation.tags(), with_tags),
            }))
        }
        _ => None,
    }
}

fn owned_tags<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>, with_tags: bool) -> Tags {
    if with_tags {
        collect_tags(pairs)
    } else {
        Tags::new()
    }
}

const fn member_kind(member_type: &RelMemberType) -> MemberKind {
    match member_type {
        RelMemberType::Node => MemberKind::Node,
        RelMemberType::Way => MemberKind::Way,
        RelMemberType::Relation => MemberKind::Relation,
    }
}
