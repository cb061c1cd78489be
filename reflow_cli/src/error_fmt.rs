//! Human-readable error descriptions and structured JSON error formatting.

use reflow_core::error::{AbortReason, BuildError, ProfileError, ReflowError};

use crate::cli::LAST_SAFETY;

pub fn abort_reason_name(r: AbortReason) -> &'static str {
    match r {
        AbortReason::SensorFault => "SensorFault",
        AbortReason::InvalidStage => "InvalidStage",
        AbortReason::MaxRuntime => "MaxRuntime",
        AbortReason::Cancelled => "Cancelled",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid controller configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML or CLI overrides.\nHow to fix: Edit the config file or the override, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<ProfileError>() {
        return format!(
            "What happened: The band table was rejected ({pe}).\nLikely causes: Bands out of stage order, bounds not increasing, or a top level above safety.top_level_limit.\nHow to fix: Fix [[profile.bands]] in the config; run `reflow profile` to see the effective table."
        );
    }

    if let Some(re) = err.downcast_ref::<ReflowError>() {
        if let ReflowError::Abort(reason) = re {
            return match reason {
                AbortReason::SensorFault => format!(
                    "What happened: The thermocouple stopped producing valid readings; heaters were switched off.\nLikely causes: Open or loose thermocouple, SPI wiring, or a failed MAX6675.\nHow to fix: Check the probe and [pins] spi_bus/spi_cs, then start a new run. Detail: {err}"
                ),
                AbortReason::InvalidStage => "What happened: The controller entered an invalid stage and fail-stopped with heaters off.\nLikely causes: Corrupted controller state.\nHow to fix: Power-cycle the controller and start a new run; report the log if it repeats.".to_string(),
                AbortReason::MaxRuntime => "What happened: max run time was exceeded; heaters were switched off.\nLikely causes: Oven too weak for the profile, door open, or max_run_ms too low.\nHow to fix: Increase safety.max_run_ms or check the heating elements.".to_string(),
                AbortReason::Cancelled => "What happened: The run was cancelled; heaters were switched off.\nLikely causes: Ctrl-C or a termination signal.\nHow to fix: Start a new run when ready.".to_string(),
            };
        }
        if matches!(re, ReflowError::InvalidStage(_)) {
            return format!(
                "What happened: {re}.\nLikely causes: Corrupted controller state.\nHow to fix: Power-cycle the controller and start a new run."
            );
        }
        if matches!(re, ReflowError::Hardware(_) | ReflowError::HardwareFault(_)) {
            return format!(
                "What happened: Switching a heater failed ({err}).\nLikely causes: Wrong [pins] heater_top/heater_bottom, GPIO permissions, or a relay driver fault.\nHow to fix: Verify wiring and pin numbers; ensure the process may access GPIO."
            );
        }
        // Fallback to generic for other domain errors
        return format!(
            "What happened: {re}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("must be") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or mistyped values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass an existing file to --config, or omit it to use defaults."
        );
    }

    if lower.contains("gpio") || lower.contains("spi") {
        return format!(
            "What happened: Failed to initialize hardware ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO/SPI permissions.\nHow to fix: Fix the [pins] values in the config; ensure SPI is enabled and the process has access."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 sensor fault, 3 max runtime, 4 cancelled, 5 invalid stage, else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ReflowError>() {
        Some(ReflowError::Abort(reason)) => match reason {
            AbortReason::SensorFault => 2,
            AbortReason::MaxRuntime => 3,
            AbortReason::Cancelled => 4,
            AbortReason::InvalidStage => 5,
        },
        Some(ReflowError::InvalidStage(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(ReflowError::Abort(reason)) = err.downcast_ref::<ReflowError>() {
        let msg = humanize(err);
        let details = LAST_SAFETY.get();
        let reason_name = abort_reason_name(*reason);

        let detail_obj = match reason {
            AbortReason::MaxRuntime => details.map(|s| json!({ "max_run_ms": s.max_run_ms })),
            AbortReason::SensorFault => {
                details.map(|s| json!({ "max_consecutive_faults": s.max_consecutive_faults }))
            }
            _ => None,
        };

        let obj = if let Some(d) = detail_obj {
            json!({ "reason": reason_name, "details": d, "message": msg })
        } else {
            json!({ "reason": reason_name, "message": msg })
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_abort_reason() {
        let cases = [
            (AbortReason::SensorFault, 2),
            (AbortReason::MaxRuntime, 3),
            (AbortReason::Cancelled, 4),
            (AbortReason::InvalidStage, 5),
        ];
        for (reason, code) in cases {
            let err = eyre::Report::new(ReflowError::Abort(reason));
            assert_eq!(exit_code_for_error(&err), code);
        }
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn context_does_not_hide_the_reason() {
        use eyre::WrapErr;
        let err: eyre::Result<()> =
            Err(eyre::Report::new(ReflowError::Abort(AbortReason::SensorFault)))
                .wrap_err("self-check: thermocouple read failed");
        let err = err.unwrap_err();
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("thermocouple"));
    }

    #[test]
    fn json_error_names_the_reason() {
        let err = eyre::Report::new(ReflowError::Abort(AbortReason::Cancelled));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Cancelled");
        assert!(v["message"].as_str().unwrap().contains("cancelled"));
    }
}
