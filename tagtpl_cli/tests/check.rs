mod common;

use clap::Parser;
use tagtpl_cli::Commands;
use tagtpl_cli::TagtplCli;
use tagtpl_core::AnyEmptyResult;

#[test]
fn check_passes_for_well_formed_templates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "one.html", "<tpl:Box>x</tpl:Box>")?;
	common::write_file(tmp.path(), "two.html", "{{tpl:value}}")?;

	let mut cmd = common::tagtpl_cmd();
	let _ = cmd
		.arg("check")
		.arg("one.html")
		.arg("two.html")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("All 2 template(s) are well formed."));

	Ok(())
}

#[test]
fn check_fails_on_structural_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "ok.html", "fine")?;
	common::write_file(tmp.path(), "broken.html", "<tpl:Box>\n</tpl:Other>")?;

	let mut cmd = common::tagtpl_cmd();
	let _ = cmd
		.arg("check")
		.arg("ok.html")
		.arg("broken.html")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::contains("broken.html 2 structural error(s)"))
		.stderr(predicates::str::contains(
			"2:1: unexpected closing tag `</tpl:Other>`",
		))
		.stderr(predicates::str::contains("tagtpl::unexpected_closing_tag"))
		.stderr(predicates::str::contains("closes nothing"))
		.stderr(predicates::str::contains(
			"1:1: did not find closing tag for block `<tpl:Box>`",
		))
		.stderr(predicates::str::contains("tagtpl::missing_closing_tag"))
		.stderr(predicates::str::contains("opened here"))
		.stderr(predicates::str::contains("2 structural error(s) found."));

	Ok(())
}

#[test]
fn check_does_not_touch_the_cache() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "page.html", "fine")?;

	let mut cmd = common::tagtpl_cmd();
	let _ = cmd
		.arg("check")
		.arg("page.html")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	assert!(!tmp.path().join(".tagtpl/cache/tagtpl").exists());

	Ok(())
}

#[test]
fn check_requires_template_names() {
	assert!(TagtplCli::try_parse_from(["tagtpl", "check"]).is_err());
}

#[test]
fn parses_global_flags_after_the_subcommand() -> AnyEmptyResult {
	let cli = TagtplCli::try_parse_from([
		"tagtpl",
		"check",
		"a.html",
		"b.html",
		"-t",
		"themes/custom",
		"--template-dir",
		"themes/default",
		"--no-cache",
	])?;

	assert_eq!(
		cli.template_dirs,
		vec![
			std::path::PathBuf::from("themes/custom"),
			std::path::PathBuf::from("themes/default"),
		]
	);
	assert!(cli.no_cache);
	assert!(matches!(
		cli.command,
		Some(Commands::Check { names }) if names == ["a.html", "b.html"]
	));

	Ok(())
}
