use gjfed::io;
use gjfed::parser::{
    self, find_all_gjf_files, parse_file, parse_lines, update_keyword_parameter,
    update_keyword_section, SectionType,
};
use std::fs;
use tempfile::TempDir;

fn raw(content: &str) -> Vec<String> {
    content.split_inclusive('\n').map(str::to_string).collect()
}

#[test]
fn test_parse_reassemble_is_byte_exact() {
    let content = "\
%chk=job.chk
#p opt freq b3lyp/6-31g* empiricaldispersion=gd3

benzene optimization

0 1
C 0.0 0.0 0.0
--Link1--
#p td=(nstates=50,root=1) b3lyp/6-31g*

excited states

0 1
C 0.0 0.0 0.0
";
    let sections = parse_lines(raw(content));
    assert_eq!(io::reassemble(&sections).concat(), content);
}

#[test]
fn test_reassemble_without_any_directive() {
    // No #p line anywhere: everything passes through verbatim.
    let content = "just a title\n\n0 1\nC 0.0 0.0 0.0\n--Link1--\nmore lines\n";
    let sections = parse_lines(raw(content));
    assert!(sections.iter().all(|s| s.keyword_section.is_none()));
    assert_eq!(io::reassemble(&sections).concat(), content);
}

#[test]
fn test_trailing_separator_round_trip() {
    // A separator on the last line opens a section with no lines; the
    // separator must still come back on reassembly.
    let content = "just a title\n--Link1--\n";
    let sections = parse_lines(raw(content));

    assert_eq!(sections.len(), 2);
    assert!(sections[1].lines.is_empty());
    assert_eq!(sections[1].link_line.as_deref(), Some("--Link1--\n"));
    assert_eq!(io::reassemble(&sections).concat(), content);
}

#[test]
fn test_consecutive_separators_round_trip() {
    let content = "first\n--Link1--\n--Link2--\nlast\n";
    let sections = parse_lines(raw(content));

    assert_eq!(sections.len(), 3);
    assert_eq!(sections[1].link_line.as_deref(), Some("--Link1--\n"));
    assert!(sections[1].lines.is_empty());
    assert_eq!(sections[2].link_line.as_deref(), Some("--Link2--\n"));
    assert_eq!(sections[2].lines, vec!["last\n"]);
    assert_eq!(io::reassemble(&sections).concat(), content);
}

#[test]
fn test_separator_only_file_round_trip() {
    let content = "--Link1--\n";
    let sections = parse_lines(raw(content));

    assert_eq!(sections.len(), 1);
    assert!(sections[0].lines.is_empty());
    assert_eq!(io::reassemble(&sections).concat(), content);
}

#[test]
fn test_noop_update_is_idempotent() {
    let content = "#p opt freq scf=tight\n\ntitle\n\n0 1\n";
    let mut sections = parse_lines(raw(content));

    let keywords = sections[0].keyword_section.as_ref().unwrap().keywords.clone();
    update_keyword_section(&mut sections[0], &keywords);

    assert_eq!(io::reassemble(&sections).concat(), content);
}

#[test]
fn test_two_sections_split_and_typing() {
    let sections = parse_lines(raw("#p opt freq\n--Link1--\n#p td=(nstates=5)\n\n"));
    assert_eq!(sections.len(), 2);

    let first = sections[0].keyword_section.as_ref().unwrap();
    assert_eq!(first.section_type, SectionType::Opt);
    assert!(!sections[0].is_link_section);
    assert!(sections[0].link_line.is_none());

    let second = sections[1].keyword_section.as_ref().unwrap();
    assert_eq!(second.section_type, SectionType::Td);
    assert!(sections[1].is_link_section);
    assert_eq!(
        sections[1].link_line.as_deref(),
        Some("--Link1--\n")
    );
}

#[test]
fn test_leading_separator_opens_the_first_section() {
    let content = "--Link1--\n#p opt freq\n--Link1--\n#p td=(nstates=5)\n";
    let sections = parse_lines(raw(content));

    assert_eq!(sections.len(), 2);
    assert_eq!(
        sections[0].keyword_section.as_ref().unwrap().section_type,
        SectionType::Opt
    );
    assert_eq!(
        sections[1].keyword_section.as_ref().unwrap().section_type,
        SectionType::Td
    );

    // Both separators are re-emitted where they stood.
    assert_eq!(io::reassemble(&sections).concat(), content);
}

#[test]
fn test_separator_line_belongs_to_no_section() {
    let sections = parse_lines(raw("first\n--Link1--\nsecond\n"));
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].lines, vec!["first\n"]);
    assert_eq!(sections[1].lines, vec!["second\n"]);
    assert_eq!(sections[1].start_line, 2);
    assert_eq!(sections[1].end_line, 3);
}

#[test]
fn test_directive_line_numbers_are_absolute() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("job.gjf");
    fs::write(
        &path,
        "%chk=job.chk\n%mem=4GB\n#p opt freq\n\ntitle\n--Link1--\n%chk=job.chk\n#p td=(nstates=5)\n",
    )
    .unwrap();

    let sections = parse_file(&path).unwrap();
    assert_eq!(sections[0].keyword_section.as_ref().unwrap().line_number, 3);
    assert_eq!(sections[1].keyword_section.as_ref().unwrap().line_number, 8);
}

#[test]
fn test_keyword_removal_rewrites_only_the_directive() {
    let content = "%chk=job.chk\n#p opt freq temperature=300\n\ntitle\n\n0 1\n";
    let mut sections = parse_lines(raw(content));

    update_keyword_section(
        &mut sections[0],
        &["opt".to_string(), "freq".to_string()],
    );

    let out = io::reassemble(&sections).concat();
    assert_eq!(out, "%chk=job.chk\n#p opt freq\n\ntitle\n\n0 1\n");
}

#[test]
fn test_keyword_addition_keeps_existing_fragments() {
    let mut sections = parse_lines(raw("#p opt td=(nstates=50,root=1)\n"));
    let mut keywords = sections[0].keyword_section.as_ref().unwrap().keywords.clone();
    keywords.push("freq".to_string());

    let lines = update_keyword_section(&mut sections[0], &keywords);
    assert_eq!(lines[0], "#p opt td=(nstates=50,root=1) freq\n");

    // Model and text stay in sync after the mutation.
    let ks = sections[0].keyword_section.as_ref().unwrap();
    assert_eq!(ks.keywords, vec!["opt", "td", "freq"]);
}

#[test]
fn test_parameter_rewrite_updates_model_and_text_together() {
    let mut sections = parse_lines(raw("#p opt td=(nstates=50,root=1) freq\n\ntitle\n"));

    let lines = update_keyword_parameter(&mut sections[0], "td", "td=(nstates=30,root=2)");
    assert_eq!(lines[0], "#p opt td=(nstates=30,root=2) freq\n");

    let ks = sections[0].keyword_section.as_ref().unwrap();
    assert_eq!(
        ks.parameters.get("td").map(String::as_str),
        Some("td=(nstates=30,root=2)")
    );
    assert_eq!(sections[0].lines[0], "#p opt td=(nstates=30,root=2) freq\n");
}

#[test]
fn test_mutation_touches_only_its_own_section() {
    let content = "#p opt\n--Link1--\n#p td=(nstates=5)\n";
    let mut sections = parse_lines(raw(content));

    update_keyword_section(&mut sections[1], &["td".to_string(), "nosymm".to_string()]);

    assert_eq!(sections[0].lines, vec!["#p opt\n"]);
    assert_eq!(
        io::reassemble(&sections).concat(),
        "#p opt\n--Link1--\n#p td=(nstates=5) nosymm\n"
    );
}

#[test]
fn test_edit_save_reload_cycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("job.gjf");
    let content = "%chk=job.chk\n#p opt b3lyp/6-31g*\n\ntitle\n\n0 1\nC 0.0 0.0 0.0\n";
    fs::write(&path, content).unwrap();

    let mut sections = parse_file(&path).unwrap();
    let mut keywords = sections[0].keyword_section.as_ref().unwrap().keywords.clone();
    keywords.push("freq".to_string());
    update_keyword_section(&mut sections[0], &keywords);
    io::write_lines(&path, &io::reassemble(&sections)).unwrap();

    let reloaded = parse_file(&path).unwrap();
    let ks = reloaded[0].keyword_section.as_ref().unwrap();
    assert_eq!(ks.keywords, vec!["opt", "b3lyp/6-31g*", "freq"]);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "%chk=job.chk\n#p opt b3lyp/6-31g* freq\n\ntitle\n\n0 1\nC 0.0 0.0 0.0\n"
    );
}

#[test]
fn test_find_gjf_files_is_sorted_and_filtered() {
    let dir = TempDir::new().unwrap();
    for name in ["b.gjf", "a.gjf", "notes.txt", "c.com"] {
        fs::write(dir.path().join(name), "").unwrap();
    }
    fs::create_dir(dir.path().join("sub.gjf")).unwrap();

    let files = find_all_gjf_files(dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.gjf", "b.gjf"]);
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = parse_file(&dir.path().join("missing.gjf")).unwrap_err();
    assert!(matches!(err, parser::ParseError::Io(_)));
}
