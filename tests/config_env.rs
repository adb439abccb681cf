// Environment variables are process-wide, so everything lives in one test
// and this file gets its own test binary.

use std::error::Error;
use std::io::Write;

use plate_resolver::config::{ CONFIG_ENV, IOU_THRESHOLD_ENV, RANK_ENV };
use plate_resolver::{ LprErrorKind, RankKey, Settings };

#[test]
fn environment_overrides_file_settings() -> Result<(), Box<dyn Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "[dedup]\niou_threshold = 0.3\n\n[resolver]\nreading_order = true")?;

    std::env::set_var(CONFIG_ENV, file.path());
    std::env::remove_var(IOU_THRESHOLD_ENV);
    std::env::remove_var(RANK_ENV);
    let settings = Settings::load(None)?;
    assert_eq!(settings.dedup.iou_threshold, 0.3);
    assert_eq!(settings.rank_key()?, RankKey::Area);
    assert!(settings.resolver.reading_order);

    std::env::set_var(IOU_THRESHOLD_ENV, "0.7");
    std::env::set_var(RANK_ENV, "confidence");
    let settings = Settings::load(None)?;
    assert_eq!(settings.dedup.iou_threshold, 0.7);
    assert_eq!(settings.rank_key()?, RankKey::Confidence);
    assert!(settings.resolver.reading_order);

    std::env::set_var(IOU_THRESHOLD_ENV, "abc");
    let err = Settings::load(None).unwrap_err();
    assert!(matches!(err.kind(), LprErrorKind::Config(_)));
    assert_eq!(err.to_string(), "invalid config: PLATE_IOU_THRESHOLD is not a number: \"abc\"");

    std::env::set_var(IOU_THRESHOLD_ENV, "0.5");
    std::env::set_var(RANK_ENV, "largest");
    assert!(Settings::load(None).is_err());

    std::env::remove_var(IOU_THRESHOLD_ENV);
    std::env::remove_var(RANK_ENV);
    std::env::set_var(CONFIG_ENV, "/nonexistent/plate-resolver.toml");
    let err = Settings::load(None).unwrap_err();
    assert!(matches!(err.kind(), LprErrorKind::IOError(_)));

    std::env::remove_var(CONFIG_ENV);
    assert_eq!(Settings::load(None)?, Settings::default());
    Ok(())
}
