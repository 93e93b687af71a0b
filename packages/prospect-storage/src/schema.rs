pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_research_jobs.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_research_jobs.sql")),
				"tables/002_companies.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_companies.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded_in_order() {
		let sql = render_schema();
		let jobs = sql.find("CREATE TABLE IF NOT EXISTS research_jobs").expect("Missing jobs table.");
		let companies =
			sql.find("CREATE TABLE IF NOT EXISTS companies").expect("Missing companies table.");

		assert!(jobs < companies);
		assert!(!sql.contains("\\ir "));
	}
}
