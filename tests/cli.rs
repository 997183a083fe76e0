use std::process::Command;

fn bcard() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bcard"))
}

#[test]
fn test_positional_argument_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = bcard().arg("stray.pdf").current_dir(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
    assert!(!dir.path().join("cards.pdf").exists());
}

#[test]
fn test_flags_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for flag in ["-h", "--help", "--version", "-o"] {
        let output = bcard().arg(flag).current_dir(dir.path()).output().unwrap();
        assert_eq!(output.status.code(), Some(1), "{}", flag);
    }
    assert!(!dir.path().join("cards.pdf").exists());
}

#[test]
fn test_missing_code_image_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = bcard().current_dir(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Failed to open code image"));
    assert!(stderr.contains("code-med-high.png"));
}

#[test]
fn test_prints_viewer_hint_on_success() {
    let dir = tempfile::tempdir().unwrap();
    image::GrayImage::from_pixel(30, 30, image::Luma([0]))
        .save(dir.path().join("code-med-high.png"))
        .unwrap();

    let output = bcard().current_dir(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "evince cards.pdf\n");
    let pdf = std::fs::read(dir.path().join("cards.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.5"));
}
