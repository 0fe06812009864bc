//! Client integration tests.
//!
//! These tests run real processes inside temporary directories created by
//! an OS client provider.
//! Run with: cargo test --test client_test

use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use warden::{Capture, ClientProvider, Cmd, Error, Input, PipeCmd, PipeCmdList, Readable};

fn provider() -> ClientProvider {
    ClientProvider::os().expect("Failed to create provider")
}

#[test]
fn test_pwd_matches_dir_path() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    let stdout = Capture::new();
    client
        .execute(Cmd::new(["pwd", "-P"]).with_stdout(&stdout))
        .wait()
        .expect("pwd failed");

    assert_eq!(stdout.trimmed(), client.dir_path().to_string_lossy());
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_env_reaches_process() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    let stdout = Capture::new();
    client
        .execute(
            Cmd::new(["sh", "-c", "echo $FOO"])
                .with_env("FOO", "foo")
                .with_stdout(&stdout),
        )
        .wait()
        .expect("sh failed");

    assert_eq!(stdout.trimmed(), "foo");
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_sort_uniq_wc_pipeline() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    let input = [
        "hello", "hello", "woot", "hello", "foo", "woot", "foo", "woot", "hello", "foo", "foo",
        "foo",
    ]
    .join("\n")
        + "\n";
    let stdout = Capture::new();
    client
        .execute_piped(
            PipeCmdList::new([
                PipeCmd::new(["sort"]),
                PipeCmd::new(["uniq"]),
                PipeCmd::new(["wc", "-l"]),
            ])
            .with_stdin(Input::bytes(input))
            .with_stdout(&stdout),
        )
        .wait()
        .expect("pipeline failed");

    assert!(stdout.trimmed().contains('3'));
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_pipeline_reads_file_written_by_client() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");
    client
        .mkdir_all("data", 0o755)
        .expect("Failed to create data dir");
    std::fs::write(client.dir_path().join("data/words"), "b\na\nc\na\n")
        .expect("Failed to write words");

    let stdout = Capture::new();
    client
        .execute_piped(
            PipeCmdList::new([
                PipeCmd::new(["cat", "words"]).with_sub_dir("data"),
                PipeCmd::new(["sort", "-u"]),
            ])
            .with_stdout(&stdout),
        )
        .wait()
        .expect("pipeline failed");

    assert_eq!(stdout.to_string_lossy(), "a\nb\nc\n");
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_list_regular_files_after_execute() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    client
        .execute(Cmd::new([
            "sh",
            "-c",
            "mkdir -p a/b && touch a/one a/b/two && ln -s one a/link",
        ]))
        .wait()
        .expect("setup failed");

    let files = client
        .list_regular_files("a")
        .expect("Failed to list files");
    assert_eq!(files, vec![Path::new("a/b/two"), Path::new("a/one")]);
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_read_lines_of_command_output() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    client
        .execute(Cmd::new(["sh", "-c", "printf 'x\\n\\n  y  \\n' > out"]))
        .wait()
        .expect("printf failed");

    let lines = client
        .read_lines(Path::new("out"))
        .expect("Failed to read lines");
    assert_eq!(lines, vec!["x", "y"]);
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_concurrent_destroy_reports_already_destroyed() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    let barrier = Arc::new(Barrier::new(10));
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let client = client.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                client.destroy()
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("destroy thread panicked"))
        .collect();
    let ok = results.iter().filter(|result| result.is_ok()).count();
    let already = results
        .iter()
        .filter(|result| matches!(result, Err(Error::AlreadyDestroyed)))
        .count();

    assert_eq!(ok, 1);
    assert_eq!(already, 9);
    assert!(!client.dir_path().exists());
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_destroy_cascades_to_sub_dir_clients() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");
    let child = client
        .new_sub_dir_client("child")
        .expect("Failed to create sub dir");
    let root_path = client.dir_path().to_path_buf();
    let child_path = child.dir_path().to_path_buf();
    assert!(child_path.is_dir());

    client.destroy().expect("Failed to destroy client");

    assert!(!root_path.exists());
    assert!(!child_path.exists());
    assert!(matches!(child.destroy(), Err(Error::AlreadyDestroyed)));
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_provider_destroy_skips_already_destroyed_clients() {
    let provider = provider();
    let first = provider
        .new_temp_dir_client()
        .expect("Failed to create client");
    let second = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    first.destroy().expect("Failed to destroy client");
    provider.destroy().expect("Failed to destroy provider");

    assert!(!first.dir_path().exists());
    assert!(!second.dir_path().exists());
    assert!(second.is_destroyed());
}

#[test]
fn test_started_process_outlives_destroy() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    let wait = client.execute(Cmd::new(["sleep", "0.2"]));
    client.destroy().expect("Failed to destroy client");
    wait.wait().expect("sleep failed");
    assert!(matches!(
        client.execute(Cmd::new(["true"])).wait(),
        Err(Error::AlreadyDestroyed)
    ));
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_absolute_path_rejected_without_mutation() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");
    let outside = tempfile::tempdir().expect("Failed to create scratch dir");
    let target = outside.path().join("created");

    assert!(matches!(client.create(&target), Err(Error::NotRelativePath(_))));
    assert!(matches!(
        client.mkdir_all(&target, 0o755),
        Err(Error::NotRelativePath(_))
    ));
    assert!(matches!(
        client.new_sub_dir_client(&target),
        Err(Error::NotRelativePath(_))
    ));
    assert!(matches!(
        client
            .execute(Cmd::new(["touch", "x"]).with_sub_dir(outside.path()))
            .wait(),
        Err(Error::NotRelativePath(_))
    ));
    assert!(!target.exists());
    assert!(!outside.path().join("x").exists());
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_execute_errors() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    assert!(matches!(
        client.execute(Cmd::new(["false"])).wait(),
        Err(Error::ExitStatus { .. })
    ));
    assert!(matches!(
        client.execute(Cmd::new(Vec::<String>::new())).wait(),
        Err(Error::EmptyArguments)
    ));
    assert!(matches!(
        client
            .execute_piped(PipeCmdList::new([PipeCmd::new(["true"])]))
            .wait(),
        Err(Error::NotMultipleCommands)
    ));
    provider.destroy().expect("Failed to destroy provider");
}

#[test]
fn test_sub_dir_already_exists() {
    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    client
        .new_sub_dir_client("work")
        .expect("Failed to create sub dir");
    assert!(matches!(
        client.new_sub_dir_client("work"),
        Err(Error::FileAlreadyExists(_))
    ));
    provider.destroy().expect("Failed to destroy provider");
}

#[cfg(feature = "tokio")]
#[tokio::test]
async fn test_wait_async_races_timer() {
    use std::time::Duration;

    let provider = provider();
    let client = provider
        .new_temp_dir_client()
        .expect("Failed to create client");

    let quick = client.execute(Cmd::new(["true"]));
    tokio::time::timeout(Duration::from_secs(10), quick.wait_async())
        .await
        .expect("true timed out")
        .expect("true failed");

    let slow = client.execute(Cmd::new(["sleep", "5"]));
    let raced = tokio::time::timeout(Duration::from_millis(100), slow.wait_async()).await;
    assert!(raced.is_err());

    provider.destroy().expect("Failed to destroy provider");
}
