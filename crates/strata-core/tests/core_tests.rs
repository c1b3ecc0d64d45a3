use strata_core::{
    Content, DIRECTORY_MIME, EngineConfig, FileArg, FileDescriptor, FileKind, Method,
    ModuleConfig, OperationOptions, ProgressSink, ReadType, Request, TransferKind,
    TransferProgress, filename_of, join_path, parent_path, same_path,
};

#[test]
fn test_descriptor_from_path() {
    let file = FileDescriptor::from_path("home:///docs/Report.PDF");
    assert_eq!(file.filename, "Report.PDF");
    assert_eq!(file.mime, "application/pdf");
    assert_eq!(file.kind, FileKind::File);

    let dir = FileDescriptor::from_path("home:///docs/");
    assert!(dir.is_dir());
    assert_eq!(dir.filename, "docs");
    assert_eq!(dir.mime, DIRECTORY_MIME);

    assert!(FileDescriptor::from_path("home:///.bashrc").is_hidden());
}

#[test]
fn test_descriptor_json_shape() {
    let desc = FileDescriptor::file("home:///a.txt", "text/plain").with_size(3);
    let json = serde_json::to_value(&desc).unwrap();
    assert_eq!(json["type"], "file");
    assert_eq!(json["size"], 3);
    assert!(json.get("id").is_none());

    let back: FileDescriptor = serde_json::from_value(json).unwrap();
    assert_eq!(back, desc);
}

#[test]
fn test_file_arg_shapes() {
    let from_object = FileArg::from(serde_json::json!({
        "path": "home:///music",
        "type": "dir",
        "id": "42",
    }))
    .into_descriptor()
    .unwrap();
    assert!(from_object.is_dir());
    assert_eq!(from_object.id.as_deref(), Some("42"));

    assert!(FileArg::from("").into_descriptor().is_none());
    assert!(FileArg::from(serde_json::json!(17)).into_descriptor().is_none());
    assert!(
        FileArg::from(serde_json::json!({ "filename": "x" }))
            .into_descriptor()
            .is_none()
    );
}

#[test]
fn test_content_shapes() {
    let content = Content::from_bytes(b"hi".to_vec(), ReadType::DataSource, "text/plain");
    assert_eq!(content, Content::DataSource("data:text/plain;base64,aGk=".into()));
    assert_eq!(content.into_bytes().unwrap(), b"hi");

    assert!(
        Content::DataSource("data:text/plain,hi".into())
            .into_bytes()
            .is_err()
    );
    assert!(Content::from("").is_empty());
}

#[test]
fn test_path_helpers() {
    assert_eq!(filename_of("home:///a/b.txt"), "b.txt");
    assert_eq!(filename_of("home:///"), "");
    assert_eq!(parent_path("home:///a/b.txt"), "home:///a");
    assert_eq!(parent_path("home:///a"), "home:///");
    assert_eq!(join_path("home:///a", "b"), "home:///a/b");
    assert_eq!(join_path("home:///", "b"), "home:///b");
    assert!(same_path("home:///a/", "home:///a"));
    assert!(!same_path("home:///a", "home:///b"));
}

#[test]
fn test_module_config_defaults() {
    let config: ModuleConfig = serde_json::from_str(r#"{ "name": "osjs", "read_only": true }"#)
        .unwrap();
    let desc = config.into_descriptor().unwrap();
    assert!(desc.read_only);
    assert!(desc.matches("osjs:///apps/"));
    assert!(!desc.matches("home:///"));
    assert_eq!(desc.root, "osjs:///");

    let bad = ModuleConfig {
        name: "x".into(),
        pattern: Some("(".into()),
        transport: None,
        read_only: false,
        internal: false,
        root: None,
    };
    assert!(bad.into_descriptor().is_err());
}

#[test]
fn test_method_names() {
    assert_eq!(Method::FreeSpace.to_string(), "freeSpace");
    assert_eq!(Method::EmptyTrash.to_string(), "emptyTrash");
    assert!(Method::Write.is_mutating());
    assert!(!Method::Read.is_mutating());

    let request = Request::Read {
        file: FileDescriptor::from_path("home:///a.txt"),
    };
    assert_eq!(request.method(), Method::Read);
    assert_eq!(request.target().path, "home:///a.txt");
}

#[test]
fn test_engine_config_default() {
    let config = EngineConfig::default();
    assert_eq!(config.actor, "system");
    assert!(EngineConfig::builder().actor("").build().is_err());
}

#[tokio::test]
async fn test_progress_sink() {
    let (sink, mut rx) = ProgressSink::channel();
    let options = OperationOptions::builder().progress(sink).build().unwrap();
    let cloned = options.with_read_type(ReadType::Text);

    cloned.report_progress(TransferProgress {
        kind: TransferKind::Copy,
        source: "a:///x".into(),
        destination: "b:///x".into(),
        percent: 50,
    });
    assert_eq!(rx.recv().await.unwrap().percent, 50);

    // No sink configured: reporting is a no-op.
    OperationOptions::default().report_progress(TransferProgress {
        kind: TransferKind::Move,
        source: "a:///x".into(),
        destination: "b:///x".into(),
        percent: 100,
    });
}
