mod common;

use tagtpl_core::AnyEmptyResult;

#[test]
fn render_uses_the_data_file_as_context() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "page.html", "Hello {{tpl:name}}!\n")?;
	let data = common::write_file(tmp.path(), "data.json", r#"{ "name": "World" }"#)?;

	let mut cmd = common::tagtpl_cmd();
	let _ = cmd
		.arg("render")
		.arg("page.html")
		.arg("--path")
		.arg(tmp.path())
		.arg("--data")
		.arg(&data)
		.assert()
		.success()
		.stdout("Hello World!\n");

	Ok(())
}

#[test]
fn render_pulls_in_included_templates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "partials/name.html", "<b>{{tpl:name}}</b>")?;
	common::write_file(
		tmp.path(),
		"page.html",
		"[{{tpl:include src=\"partials/name.html\"}}]",
	)?;
	let data = common::write_file(tmp.path(), "data.json", r#"{ "name": "World" }"#)?;

	let mut cmd = common::tagtpl_cmd();
	let _ = cmd
		.arg("render")
		.arg("page.html")
		.arg("--path")
		.arg(tmp.path())
		.arg("--data")
		.arg(&data)
		.assert()
		.success()
		.stdout("[<b>World</b>]");

	Ok(())
}

#[test]
fn render_without_data_leaves_values_empty() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "page.html", "a{{tpl:missing}}b")?;

	let mut cmd = common::tagtpl_cmd();
	let _ = cmd
		.arg("render")
		.arg("page.html")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("ab");

	Ok(())
}

#[test]
fn render_rejects_invalid_data_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "page.html", "x")?;
	let data = common::write_file(tmp.path(), "data.json", "{ not json")?;

	let mut cmd = common::tagtpl_cmd();
	let _ = cmd
		.arg("render")
		.arg("page.html")
		.arg("--path")
		.arg(tmp.path())
		.arg("--data")
		.arg(&data)
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse data file"));

	Ok(())
}
