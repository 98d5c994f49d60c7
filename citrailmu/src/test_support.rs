use std::path::Path;
use std::process::Command;

/// Whether both ffmpeg and ffprobe can be run from `PATH`.
pub fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|program| {
        Command::new(program)
            .arg("-version")
            .output()
            .is_ok_and(|o| o.status.success())
    })
}

/// Write a 440 Hz sine WAV fixture.
pub fn write_wav(path: &Path, channels: u16, sample_rate: u32, seconds: f32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (sample_rate as f32 * seconds) as u32;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (t * 440.0 * std::f32::consts::TAU).sin() * 0.5 * i16::MAX as f32;
        for _ in 0..channels {
            writer.write_sample(sample as i16).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Write an executable `/bin/sh` script standing in for an external tool.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// ffprobe reporting a 2 s mono stream, ffmpeg writing `COMPRESSED` to its
/// last argument. Returns `(ffmpeg, ffprobe)`.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path) -> (String, String) {
    let ffprobe = fake_tool(
        dir,
        "ffprobe",
        r#"echo '{"streams": [{"channels": 1, "sample_rate": "22050"}], "format": {"duration": "2.000000"}}'"#,
    );
    let ffmpeg = fake_tool(dir, "ffmpeg", r#"for last; do :; done; printf COMPRESSED > "$last""#);
    (ffmpeg, ffprobe)
}
