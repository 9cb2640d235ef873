// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Behavioral tests for the dispatcher façade and its components

use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::{self, MountLocations};
use crate::dispatcher::Dispatcher;
use crate::error::HostStatus;
use crate::host::VirtualizationHost;
use crate::notify::NotificationKind;
use crate::resolver::MetadataResolver;
use crate::testing::fixtures::{FakeTree, RecordingHost, VecSink};
use crate::transfer::{TransferEngine, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::tree::{InodeTree, MockInodeTree, NodeHandle, NodeStat};
use crate::types::{DataStreamId, EnumerationId, RelPath};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

fn locations() -> MountLocations {
    MountLocations {
        root: PathBuf::from("/mnt/work"),
        socket: PathBuf::from("/run/lensfs/work.sock"),
        client: PathBuf::from("/var/lib/lensfs/clients/work"),
    }
}

struct Fixture {
    // Kept alive so the dispatcher's runtime handle stays valid.
    _runtime: Runtime,
    tree: Arc<FakeTree>,
    host: Arc<RecordingHost>,
    dispatcher: Dispatcher,
}

fn fixture_with(tree: FakeTree, host: RecordingHost) -> Fixture {
    let runtime = Runtime::new().expect("runtime");
    let tree = Arc::new(tree);
    let host = Arc::new(host);
    let dispatcher = Dispatcher::new(
        Arc::clone(&tree) as Arc<dyn InodeTree>,
        Arc::clone(&host) as Arc<dyn VirtualizationHost>,
        &locations(),
        runtime.handle().clone(),
    )
    .expect("dispatcher");
    Fixture {
        _runtime: runtime,
        tree,
        host,
        dispatcher,
    }
}

fn seeded_tree() -> FakeTree {
    let tree = FakeTree::new();
    tree.add_dir("src");
    tree.add_dir("docs");
    tree.add_file("src/a.txt", b"alpha");
    tree.add_file("src/lib.rs", b"pub fn lens() {}");
    tree.add_file("README.md", b"readme");
    tree
}

fn fixture() -> Fixture {
    fixture_with(seeded_tree(), RecordingHost::new(4096))
}

// --- Enumeration sessions ------------------------------------------------

#[test]
fn start_then_drain_yields_ordered_snapshot() {
    let fx = fixture();
    let id = EnumerationId::new();
    assert_eq!(fx.dispatcher.start_enumeration(id, &RelPath::new("src")), HostStatus::Ok);

    let mut sink = VecSink::unbounded();
    assert_eq!(fx.dispatcher.get_enumeration_data(id, None, false, &mut sink), HostStatus::Ok);
    assert_eq!(sink.names(), vec!["a.txt", "lib.rs"]);
    assert_eq!(fx.dispatcher.end_enumeration(id), HostStatus::Ok);
}

#[test]
fn snapshot_ignores_concurrent_tree_mutation() {
    let fx = fixture();
    let id = EnumerationId::new();
    assert_eq!(fx.dispatcher.start_enumeration(id, &RelPath::new("src")), HostStatus::Ok);

    // Mutations after start must not appear in the session.
    fx.tree.add_file("src/zzz.rs", b"late");

    let mut sink = VecSink::unbounded();
    assert_eq!(fx.dispatcher.get_enumeration_data(id, None, false, &mut sink), HostStatus::Ok);
    assert_eq!(sink.names(), vec!["a.txt", "lib.rs"]);
}

#[test]
fn restart_drains_identical_sequence() {
    let fx = fixture();
    let id = EnumerationId::new();
    fx.dispatcher.start_enumeration(id, &RelPath::new("src"));

    let mut first = VecSink::unbounded();
    fx.dispatcher.get_enumeration_data(id, Some("*.rs"), false, &mut first);

    let mut second = VecSink::unbounded();
    assert_eq!(
        fx.dispatcher.get_enumeration_data(id, None, true, &mut second),
        HostStatus::Ok
    );
    assert_eq!(first.entries, second.entries);
}

#[test]
fn sink_exhaustion_resumes_without_duplicates_or_gaps() {
    let fx = fixture();
    let id = EnumerationId::new();
    fx.dispatcher.start_enumeration(id, &RelPath::new("src"));

    let mut first = VecSink::with_capacity(1);
    assert_eq!(fx.dispatcher.get_enumeration_data(id, None, false, &mut first), HostStatus::Ok);
    assert_eq!(first.names(), vec!["a.txt"]);

    let mut second = VecSink::with_capacity(1);
    assert_eq!(fx.dispatcher.get_enumeration_data(id, None, false, &mut second), HostStatus::Ok);
    assert_eq!(second.names(), vec!["lib.rs"]);

    // Drained: further calls are successful no-ops.
    let mut third = VecSink::unbounded();
    assert_eq!(fx.dispatcher.get_enumeration_data(id, None, false, &mut third), HostStatus::Ok);
    assert!(third.entries.is_empty());
}

#[test]
fn duplicate_start_is_a_contract_violation() {
    let fx = fixture();
    let id = EnumerationId::new();
    assert_eq!(fx.dispatcher.start_enumeration(id, &RelPath::new("src")), HostStatus::Ok);
    assert_eq!(
        fx.dispatcher.start_enumeration(id, &RelPath::new("docs")),
        HostStatus::InvalidParameter
    );
}

#[test]
fn end_without_start_is_a_contract_violation() {
    let fx = fixture();
    assert_eq!(fx.dispatcher.end_enumeration(EnumerationId::new()), HostStatus::InvalidParameter);
}

#[test]
fn continue_on_unknown_session_is_not_escalated() {
    let fx = fixture();
    let mut sink = VecSink::unbounded();
    // The host may probe with get-data before start; invalid
    // parameter, nothing served, nothing torn down.
    assert_eq!(
        fx.dispatcher.get_enumeration_data(EnumerationId::new(), None, false, &mut sink),
        HostStatus::InvalidParameter
    );
    assert!(sink.entries.is_empty());
}

#[test]
fn start_enumeration_on_missing_directory_reports_not_found() {
    let fx = fixture();
    assert_eq!(
        fx.dispatcher.start_enumeration(EnumerationId::new(), &RelPath::new("no/such/dir")),
        HostStatus::NotFound
    );
}

// --- Metadata resolution -------------------------------------------------

#[test]
fn get_file_info_writes_placeholder_with_canonical_name() {
    let fx = fixture();
    // Case-differing lookup; the placeholder must carry the tree's
    // canonical spelling.
    assert_eq!(fx.dispatcher.get_file_info(&RelPath::new("readme.MD")), HostStatus::Ok);

    let placeholders = fx.host.placeholders();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].name, "README.md");
    assert!(!placeholders[0].is_directory);
    assert_eq!(placeholders[0].size, b"readme".len() as u64);
}

#[test]
fn get_file_info_for_directory_reports_directory_flag() {
    let fx = fixture();
    assert_eq!(fx.dispatcher.get_file_info(&RelPath::new("src")), HostStatus::Ok);
    let placeholders = fx.host.placeholders();
    assert!(placeholders[0].is_directory);
}

#[test]
fn get_file_info_missing_path_is_not_found_and_writes_nothing() {
    let fx = fixture();
    assert_eq!(fx.dispatcher.get_file_info(&RelPath::new("ghost.txt")), HostStatus::NotFound);
    assert!(fx.host.placeholders().is_empty());
}

#[test]
fn query_file_name_reports_existence() {
    let fx = fixture();
    assert_eq!(fx.dispatcher.query_file_name(&RelPath::new("src/a.txt")), HostStatus::Ok);
    assert_eq!(fx.dispatcher.query_file_name(&RelPath::new("ghost.txt")), HostStatus::NotFound);
}

#[test]
fn resolver_rederives_canonical_name_from_tree() {
    let runtime = Runtime::new().expect("runtime");
    let mut tree = MockInodeTree::new();
    tree.expect_lookup()
        .withf(|path: &RelPath| path.as_str() == "readme.md")
        .returning(|_| Ok(NodeHandle::new(RelPath::new("README.md"))));
    tree.expect_stat().returning(|_| {
        Ok(NodeStat {
            size: 6,
            is_directory: false,
        })
    });

    let resolver = MetadataResolver::new(Arc::new(tree), config::virtual_config_path(), 0);
    let metadata = runtime
        .block_on(resolver.resolve(&RelPath::new("readme.md")))
        .expect("resolve")
        .expect("metadata");
    assert_eq!(metadata.name, "README.md");
}

// --- The virtual config file ---------------------------------------------

#[test]
fn virtual_config_resolves_from_all_three_read_paths() {
    let fx = fixture();
    let payload = config::render_virtual_config(&locations()).expect("render");
    let path = RelPath::new(config::VIRTUAL_CONFIG_PATH);

    // Metadata lookup: non-directory, exact serialized length.
    assert_eq!(fx.dispatcher.get_file_info(&path), HostStatus::Ok);
    let placeholders = fx.host.placeholders();
    assert_eq!(placeholders[0].name, config::VIRTUAL_CONFIG_PATH);
    assert!(!placeholders[0].is_directory);
    assert_eq!(placeholders[0].size, payload.len() as u64);

    // Name query.
    assert_eq!(fx.dispatcher.query_file_name(&path), HostStatus::Ok);

    // Data read serves the rendered payload even though the tree
    // has no such entry.
    assert_eq!(
        fx.dispatcher.get_file_data(&path, DataStreamId::new(), 0, payload.len() as u32),
        HostStatus::Ok
    );
    assert_eq!(fx.host.assembled(), payload);
}

// --- Chunked transfer ----------------------------------------------------

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn small_file_is_sent_whole_ignoring_the_requested_range() {
    let host = Arc::new(RecordingHost::new(4096));
    let engine = TransferEngine::new(Arc::clone(&host) as Arc<dyn VirtualizationHost>);
    let content = patterned(10);

    engine.deliver(DataStreamId::new(), &content, 3, 4).expect("deliver");

    let writes = host.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, 0);
    assert_eq!(writes[0].1, content);
}

#[test]
fn midsize_request_is_sent_as_one_exact_range() {
    let host = Arc::new(RecordingHost::new(4096));
    let engine = TransferEngine::new(Arc::clone(&host) as Arc<dyn VirtualizationHost>);
    let content = patterned(MIB as usize);

    engine
        .deliver(DataStreamId::new(), &content, 700 * KIB, (64 * KIB) as u32)
        .expect("deliver");

    let writes = host.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, 700 * KIB);
    assert_eq!(writes[0].1, content[(700 * KIB) as usize..(764 * KIB) as usize]);
}

#[test]
fn request_past_eof_is_clamped_to_the_content() {
    // 1 MiB of content answering a 2 MiB request.
    let host = Arc::new(RecordingHost::new(4096));
    let engine = TransferEngine::new(Arc::clone(&host) as Arc<dyn VirtualizationHost>);
    let content = patterned(MIB as usize);

    engine.deliver(DataStreamId::new(), &content, 0, (2 * MIB) as u32).expect("deliver");

    assert_eq!(host.assembled(), content);
}

#[test]
fn oversized_request_is_split_into_aligned_chunks() {
    let host = Arc::new(RecordingHost::new(4096));
    let engine = TransferEngine::new(Arc::clone(&host) as Arc<dyn VirtualizationHost>);
    let content = patterned((20 * MIB) as usize);
    let offset = 10 * MIB + 100;
    let length = 6 * MIB;

    engine.deliver(DataStreamId::new(), &content, offset, length as u32).expect("deliver");

    // One buffer, sized by rounding offset + max chunk down to the
    // write alignment.
    let expected_chunk = ((offset + MAX_CHUNK_SIZE) & !4095) - offset;
    assert_eq!(host.allocations(), vec![expected_chunk as usize]);

    let writes = host.writes();
    assert!(writes.len() > 1);
    assert_eq!(writes[0].0, offset);
    let mut expected_offset = offset;
    for (write_offset, data) in &writes {
        assert_eq!(*write_offset, expected_offset);
        assert!(data.len() as u64 <= expected_chunk);
        expected_offset += data.len() as u64;
    }
    assert_eq!(
        host.assembled(),
        content[offset as usize..(offset + length) as usize]
    );
}

#[test]
fn whole_file_boundary_sizes_round_trip() {
    for size in [MIN_CHUNK_SIZE, MIN_CHUNK_SIZE + 1] {
        let host = Arc::new(RecordingHost::new(512));
        let engine = TransferEngine::new(Arc::clone(&host) as Arc<dyn VirtualizationHost>);
        let content = patterned(size as usize);
        engine.deliver(DataStreamId::new(), &content, 0, size as u32).expect("deliver");
        assert_eq!(host.assembled(), content);
    }
}

#[test]
fn allocation_failure_reports_out_of_memory() {
    let fx = fixture_with(seeded_tree(), RecordingHost::failing_allocation(4096));
    assert_eq!(
        fx.dispatcher.get_file_data(&RelPath::new("src/a.txt"), DataStreamId::new(), 0, 5),
        HostStatus::OutOfMemory
    );
}

#[test]
fn write_failure_is_propagated_unchanged() {
    let fx = fixture_with(seeded_tree(), RecordingHost::failing_writes(4096, HostStatus::Io));
    assert_eq!(
        fx.dispatcher.get_file_data(&RelPath::new("src/a.txt"), DataStreamId::new(), 0, 5),
        HostStatus::Io
    );
}

#[test]
fn get_file_data_for_missing_path_is_not_found() {
    let fx = fixture();
    assert_eq!(
        fx.dispatcher.get_file_data(&RelPath::new("ghost.bin"), DataStreamId::new(), 0, 1),
        HostStatus::NotFound
    );
    assert!(fx.host.writes().is_empty());
}

// --- Change notifications ------------------------------------------------

#[test]
fn new_file_created_adds_the_entry() {
    let fx = fixture();
    let status = fx.dispatcher.notification(
        NotificationKind::NewFileCreated.as_raw(),
        &RelPath::new("docs/notes.txt"),
        &RelPath::root(),
        false,
    );
    assert_eq!(status, HostStatus::Ok);
    assert!(fx.tree.contains("docs/notes.txt"));
}

#[test]
fn overwrite_and_close_modified_both_materialize() {
    for kind in [
        NotificationKind::FileOverwritten,
        NotificationKind::HandleClosedFileModified,
    ] {
        let fx = fixture();
        let status = fx.dispatcher.notification(
            kind.as_raw(),
            &RelPath::new("src/a.txt"),
            &RelPath::root(),
            false,
        );
        assert_eq!(status, HostStatus::Ok);
        assert!(fx.tree.is_materialized("src/a.txt"));
    }
}

#[test]
fn handle_closed_deleted_removes_the_entry() {
    let fx = fixture();
    let status = fx.dispatcher.notification(
        NotificationKind::HandleClosedFileDeleted.as_raw(),
        &RelPath::new("src/a.txt"),
        &RelPath::root(),
        false,
    );
    assert_eq!(status, HostStatus::Ok);
    assert!(!fx.tree.contains("src/a.txt"));
}

#[test]
fn rename_moves_the_entry_between_parents() {
    let fx = fixture();
    let status = fx.dispatcher.notification(
        NotificationKind::FileRenamed.as_raw(),
        &RelPath::new("src/a.txt"),
        &RelPath::new("docs/a.txt"),
        false,
    );
    assert_eq!(status, HostStatus::Ok);
    assert!(!fx.tree.contains("src/a.txt"));
    assert!(fx.tree.contains("docs/a.txt"));
}

#[test]
fn rename_with_empty_source_behaves_as_creation() {
    let fx = fixture();
    let status = fx.dispatcher.notification(
        NotificationKind::FileRenamed.as_raw(),
        &RelPath::root(),
        &RelPath::new("docs/moved-in.txt"),
        false,
    );
    assert_eq!(status, HostStatus::Ok);
    assert!(fx.tree.contains("docs/moved-in.txt"));
}

#[test]
fn rename_with_empty_destination_behaves_as_removal() {
    let fx = fixture();
    let status = fx.dispatcher.notification(
        NotificationKind::FileRenamed.as_raw(),
        &RelPath::new("src/a.txt"),
        &RelPath::root(),
        false,
    );
    assert_eq!(status, HostStatus::Ok);
    assert!(!fx.tree.contains("src/a.txt"));
}

#[test]
fn hard_links_are_always_refused() {
    for (path, is_directory) in [("src/a.txt", false), ("docs", true), ("no/such/path", false)] {
        let fx = fixture();
        let status = fx.dispatcher.notification(
            NotificationKind::PreSetHardlink.as_raw(),
            &RelPath::new(path),
            &RelPath::root(),
            is_directory,
        );
        assert_eq!(status, HostStatus::AccessDenied);
        assert_eq!(fx.tree.mutation_count(), 0);
    }
}

#[test]
fn unknown_notification_code_mutates_nothing() {
    let fx = fixture();
    let status = fx.dispatcher.notification(
        0x100, // a host code outside the supported set
        &RelPath::new("src/a.txt"),
        &RelPath::root(),
        false,
    );
    assert_eq!(status, HostStatus::InvalidParameter);
    assert_eq!(fx.tree.mutation_count(), 0);
}

#[test]
fn unknown_notification_code_never_touches_the_tree() {
    // A mock with no expectations panics on any call.
    let runtime = Runtime::new().expect("runtime");
    let tree: Arc<dyn InodeTree> = Arc::new(MockInodeTree::new());
    let host = Arc::new(RecordingHost::new(4096));
    let dispatcher = Dispatcher::new(
        tree,
        Arc::clone(&host) as Arc<dyn VirtualizationHost>,
        &locations(),
        runtime.handle().clone(),
    )
    .expect("dispatcher");

    let status =
        dispatcher.notification(0x200, &RelPath::new("a"), &RelPath::new("b"), false);
    assert_eq!(status, HostStatus::InvalidParameter);
}
