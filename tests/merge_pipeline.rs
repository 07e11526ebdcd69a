//! End-to-end merge runs over a small lecture tree in a temp folder.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};
use texmerge::{MergeSettings, Merger};

const MASTER: &str = "\
\\documentclass{ctexbook}
\\usepackage{tikz}
\\begin{document}
\\tableofcontents
%!!!ContentStart
%!!!ContentEnd
\\end{document}
";

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fragment(preamble: &str, title: &str, body: &str) -> String {
    format!(
        "\\documentclass{{ctexart}}\n{}\\title{{{}}}\n\\begin{{document}}\n\\maketitle\n{}\n\\end{{document}}\n",
        preamble, title, body
    )
}

struct Lecture {
    dir: TempDir,
    inputs: Vec<PathBuf>,
}

impl Lecture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("lecture.tex"), MASTER);
        write(&root.join("parts/header.tex"), "\\setcounter{section}{0}\n");
        write(&root.join("fig/size200/slope.pdf"), "%PDF");
        write(&root.join("fig/plane.asy"), "import three;\nsize(500);\n");

        let sources = [
            (
                "Series-01-power.tex",
                fragment(
                    "\\usetikzlibrary{calc}\n",
                    "第三章\\,级数",
                    "\\section{幂级数}",
                ),
            ),
            (
                "Differential-01-limits.tex",
                fragment(
                    "",
                    "第一章\\,极限",
                    "\\includegraphics[width=3cm]{slope.pdf}\n\\input{local-macros}",
                ),
            ),
            (
                "Integral-01-area.tex",
                fragment(
                    "\\usetikzlibrary{arrows, calc}\n",
                    "第二章\u{2014}积分",
                    "Area under a curve.",
                ),
            ),
        ];
        let inputs = sources
            .iter()
            .map(|(name, text)| {
                let path = root.join("drafts").join(name);
                write(&path, text);
                path
            })
            .collect();
        Lecture { dir, inputs }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn settings(&self) -> MergeSettings {
        let mut config = texmerge_config::load_defaults().unwrap();
        config.paths.main = PathBuf::from("lecture.tex");
        MergeSettings::from_config(&config, self.root())
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }
}

#[test]
fn three_categories_are_injected_in_order() {
    let lecture = Lecture::new();
    let report = Merger::new(lecture.settings()).run(&lecture.inputs).unwrap();

    assert_eq!(report.summary(), "All done without warnings.");
    let master = lecture.read("lecture.tex");
    let inputs: Vec<&str> = master
        .lines()
        .filter(|line| line.starts_with("\\input{"))
        .collect();
    assert_eq!(
        inputs,
        vec![
            "\\input{./parts/Differential/Differential-01-limits-trim.tex}",
            "\\input{./parts/Integral/Integral-01-area-trim.tex}",
            "\\input{./parts/Series/Series-01-power-trim.tex}",
        ]
    );
    assert!(master.contains("\\begin{document}\n\\usetikzlibrary{arrows, calc}\n"));
    assert!(master.starts_with("\\documentclass{ctexbook}\n\\usepackage{tikz}\n"));
    assert!(master.ends_with("%!!!ContentEnd\n\\end{document}\n"));
}

#[test]
fn fragments_are_trimmed_and_decorated() {
    let lecture = Lecture::new();
    Merger::new(lecture.settings()).run(&lecture.inputs).unwrap();

    assert_eq!(
        lecture.read("parts/Differential/Differential-01-limits-trim.tex"),
        "\\chapter{极限}\n\\input{./parts/header.tex}\n\\includegraphics[width=5.20cm]{./fig/size200/slope.pdf}\n"
    );
    assert_eq!(
        lecture.read("parts/Series/Series-01-power-trim.tex"),
        "\\chapter{级数}\n\\input{./parts/header.tex}\n\\section{幂\\hskip 1em 级\\hskip 1em 数}\n"
    );
}

#[test]
fn figures_are_arranged_before_merging() {
    let lecture = Lecture::new();
    Merger::new(lecture.settings()).run(&lecture.inputs).unwrap();

    assert!(lecture.root().join("fig/size500/plane.asy").is_file());
    assert!(!lecture.root().join("fig/plane.asy").exists());
}

#[test]
fn rerunning_gives_the_same_master() {
    let lecture = Lecture::new();
    let merger = Merger::new(lecture.settings());
    merger.run(&lecture.inputs).unwrap();
    let first = lecture.read("lecture.tex");
    merger.run(&lecture.inputs).unwrap();
    assert_eq!(lecture.read("lecture.tex"), first);
}

#[test]
fn missing_figure_is_a_counted_warning() {
    let lecture = Lecture::new();
    let extra = lecture.root().join("drafts/Integral-02-volume.tex");
    write(
        &extra,
        &fragment("", "第二章\\,体积", "\\includegraphics[width=2cm]{nowhere.pdf}"),
    );
    let mut inputs = lecture.inputs.clone();
    inputs.push(extra);

    let report = Merger::new(lecture.settings()).run(&inputs).unwrap();

    assert_eq!(report.summary(), "All done with 1 warning(s).");
    assert_eq!(report.injected.len(), 4);
}
