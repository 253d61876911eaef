use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct PlaySummary {
    linked: bool,
    sessions: Vec<SessionSummary>,
}

#[derive(Deserialize)]
struct SessionSummary {
    id: String,
    cursor: usize,
    rate: f64,
    playing: bool,
    channels: Vec<ChannelSummary>,
}

#[derive(Deserialize)]
struct ChannelSummary {
    name: String,
    samples: usize,
}

#[derive(Deserialize)]
struct FrameLine {
    session: String,
    cursor: usize,
    slices: Vec<SliceLine>,
    y_range: Range,
}

#[derive(Deserialize)]
struct SliceLine {
    start: usize,
    samples: Vec<f64>,
}

#[derive(Deserialize)]
struct Range {
    start: f64,
    end: f64,
}

fn simulate(dir: &Path, name: &str, samples: usize) -> PathBuf {
    let out = dir.join(name);
    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "simulate",
        "--samples",
        &samples.to_string(),
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();
    out
}

#[test]
fn simulate_writes_the_requested_sample_count() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = simulate(dir.path(), "ecg.txt", 1200);
    let text = std::fs::read_to_string(&path)?;
    let values: Result<Vec<f64>, _> = text.lines().map(str::parse).collect();
    assert_eq!(values?.len(), 1200);
    Ok(())
}

#[test]
fn ten_ticks_leave_the_cursor_at_ten() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let signal = simulate(dir.path(), "ecg.txt", 5000);

    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "play",
        "--channel-a",
        signal.to_str().expect("utf8 path"),
        "--ticks",
        "10",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let summary: PlaySummary = serde_json::from_slice(&output)?;

    assert!(!summary.linked);
    let a = &summary.sessions[0];
    assert_eq!(a.id, "Graph A");
    assert_eq!(a.cursor, 10);
    assert!(a.playing);
    assert_eq!(a.rate, 1.0);
    assert_eq!(a.channels.len(), 1);
    assert_eq!(a.channels[0].name, "Channel 1");
    assert_eq!(a.channels[0].samples, 5000);
    // The empty lane never advanced.
    assert_eq!(summary.sessions[1].cursor, 0);
    Ok(())
}

#[test]
fn frame_stream_grows_one_sample_per_tick() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let signal = simulate(dir.path(), "ecg.txt", 5000);

    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "play",
        "--channel-a",
        signal.to_str().expect("utf8 path"),
        "--ticks",
        "11",
        "--emit",
        "frames",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let frames: Vec<FrameLine> = std::str::from_utf8(&output)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(frames.len(), 11);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.session, "Graph A");
        assert_eq!(frame.cursor, i);
        assert_eq!(frame.slices[0].start, 0);
        assert_eq!(frame.slices[0].samples.len(), i + 1);
        assert!(frame.y_range.end >= frame.y_range.start);
    }
    Ok(())
}

#[test]
fn linking_resets_both_rates_to_neutral() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let a = simulate(dir.path(), "a.txt", 2000);
    let b = simulate(dir.path(), "b.txt", 2000);

    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "play",
        "--channel-a",
        a.to_str().expect("utf8 path"),
        "--channel-b",
        b.to_str().expect("utf8 path"),
        "--rate-a",
        "75",
        "--rate-b",
        "20",
        "--link",
        "--ticks",
        "0",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let summary: PlaySummary = serde_json::from_slice(&output)?;

    assert!(summary.linked);
    for session in &summary.sessions {
        assert_eq!(session.rate, 1.0);
        assert_eq!(session.cursor, 0);
        assert!(session.playing);
    }
    Ok(())
}

#[test]
fn linked_lanes_tick_in_lockstep() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let a = simulate(dir.path(), "a.txt", 2000);
    let b = simulate(dir.path(), "b.txt", 2000);

    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "play",
        "--channel-a",
        a.to_str().expect("utf8 path"),
        "--channel-b",
        b.to_str().expect("utf8 path"),
        "--link",
        "--ticks",
        "25",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let summary: PlaySummary = serde_json::from_slice(&output)?;
    assert_eq!(summary.sessions[0].cursor, 25);
    assert_eq!(summary.sessions[1].cursor, 25);
    Ok(())
}

#[test]
fn render_produces_a_png() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let signal = simulate(dir.path(), "ecg.txt", 2000);
    let out = dir.path().join("frame.png");

    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "render",
        "--channel",
        signal.to_str().expect("utf8 path"),
        "--cursor",
        "500",
        "--zoom",
        "2",
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();

    let bytes = std::fs::read(&out)?;
    assert!(bytes.len() > 8);
    assert_eq!(&bytes[1..4], b"PNG");
    Ok(())
}
