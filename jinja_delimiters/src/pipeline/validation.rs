use crate::config::DelimiterConfig;

/// Check every stage's codes and limits (startup)
pub fn validate_pipeline() -> Result<(), String> {
    crate::log_debug!("Validating pipeline configuration");

    crate::file_processor::init_file_processor_logging()?;
    crate::lexical::validate_tokenization()?;
    crate::syntax::validate_syntax_codes()?;
    crate::analysis::validate_analysis()?;

    DelimiterConfig::default()
        .validate()
        .map_err(|e| format!("Default delimiters are invalid: {}", e))?;

    crate::log_success!(
        crate::logging::codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Pipeline validation succeeded",
        "stages_validated" => 5
    );

    Ok(())
}
