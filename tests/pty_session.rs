// Drives the compiled binary through a pseudo terminal, covering the real
// crossterm reader thread and raw mode handling.
//
// Requires a TTY-capable environment, so it is ignored by default:
// `cargo test --test pty_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn prompt_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("termtyper");
    let cmd = format!("env HOME={} {} -p hi -c block", home.path().display(), bin.display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("hi")?;
    p.expect("2/2/0")?;
    p.expect(Eof)?;

    assert!(home.path().join(".local/state/termtyper/stats.db").exists());
    Ok(())
}

#[test]
#[ignore]
fn ctrl_c_cancels_without_error() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("termtyper");
    let cmd = format!("env HOME={} {} -p hello", home.path().display(), bin.display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("he")?;
    p.send("\x03")?;
    p.expect(Eof)?;
    Ok(())
}
