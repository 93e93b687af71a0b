//! Search spend and duration helpers for job summaries.

pub const DEFAULT_USD_PER_CREDIT: f64 = 0.008;

pub fn estimate_cost(credits: f64, usd_per_credit: f64) -> f64 {
	if !credits.is_finite() || credits <= 0.0 {
		return 0.0;
	}

	credits * usd_per_credit
}

pub fn format_cost(usd: f64) -> String {
	if usd < 0.001 {
		return "< $0.001".to_string();
	}

	format!("${usd:.3}")
}

pub fn format_duration(seconds: f64) -> String {
	if seconds < 60.0 {
		format!("{seconds:.1}s")
	} else if seconds < 3_600.0 {
		format!("{:.1}m", seconds / 60.0)
	} else {
		format!("{:.1}h", seconds / 3_600.0)
	}
}
