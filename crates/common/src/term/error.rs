use crate::logger;

pub fn log_error(error: anyhow::Error) {
    logger::error(error.to_string());

    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !causes.is_empty() {
        logger::warn(format!("Caused by:\n{}", causes.join("\n")));
    }
    logger::outro("Failed to run command");
}
