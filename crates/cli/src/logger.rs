pub(crate) fn init(debug: bool, trace: bool, quiet: bool) -> Result<(), log::SetLoggerError> {
    let level = if quiet {
        log::LevelFilter::Error
    } else if trace {
        log::LevelFilter::Trace
    } else if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(level)
        .chain(std::io::stderr())
        .apply()
}
