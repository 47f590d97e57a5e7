use crate::{error::SettingsError, settings::PipelineSettings};

pub fn validate(settings: &PipelineSettings) -> Result<(), SettingsError> {
    if settings.name.trim().is_empty() {
        return Err(SettingsError::EmptyName);
    }

    let fraction = settings.min_success_percentage;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(SettingsError::InvalidSuccessPercentage(fraction));
    }

    if settings.batch_size == 0 {
        return Err(SettingsError::ZeroBatchSize);
    }

    Ok(())
}
