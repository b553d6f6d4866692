use flexi_logger::{DeferredNow, TS_DASHES_BLANK_COLONS_DOT_BLANK, style};
use log::Record;

/// `[timestamp] LEVEL [module] message`, level colored.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    write!(
        w,
        "[{}] {} [{}] {}",
        now.format(TS_DASHES_BLANK_COLONS_DOT_BLANK),
        style(level).paint(level.to_string()),
        record.module_path().unwrap_or("<unnamed>"),
        record.args()
    )
}
