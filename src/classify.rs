use std::fmt;

/// Canonical short label for the venues we recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conference {
    Atc,
    Sosp,
    Asplos,
    EuroSys,
    Hpc,
    Nsdi,
    PPoPP,
    Osdi,
    Fast,
    Micro,
}

impl Conference {
    pub fn label(self) -> &'static str {
        match self {
            Conference::Atc => "ATC",
            Conference::Sosp => "SOSP",
            Conference::Asplos => "ASPLOS",
            Conference::EuroSys => "EuroSys",
            Conference::Hpc => "HPC",
            Conference::Nsdi => "NSDI",
            Conference::PPoPP => "PPoPP",
            Conference::Osdi => "OSDI",
            Conference::Fast => "FAST",
            Conference::Micro => "Micro",
        }
    }
}

impl fmt::Display for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

enum Rule {
    Url(&'static str, Conference),
    Meeting(&'static str, Conference),
}

// Evaluated top to bottom; the first hit wins. The URL `atc` check must stay first.
const RULES: &[Rule] = &[
    Rule::Url("atc", Conference::Atc),
    Rule::Meeting("annual technical conference", Conference::Atc),
    Rule::Meeting("symposium on operating systems principles", Conference::Sosp),
    Rule::Meeting(
        "architectural support for programming languages and operating systems",
        Conference::Asplos,
    ),
    Rule::Meeting("european conference on computer systems", Conference::EuroSys),
    Rule::Meeting(
        "high performance computing, networking, storage and analysis",
        Conference::Hpc,
    ),
    Rule::Meeting("networked systems design and implementation", Conference::Nsdi),
    Rule::Meeting("principles and practice of parallel programming", Conference::PPoPP),
    Rule::Meeting("operating systems design and implementation", Conference::Osdi),
    Rule::Meeting("file and storage technologies", Conference::Fast),
    Rule::Meeting("symposium on microarchitecture", Conference::Micro),
    Rule::Url("nsdi", Conference::Nsdi),
    Rule::Url("osdi", Conference::Osdi),
    Rule::Url("fast", Conference::Fast),
];

/// Map a venue name and paper URL to a conference, if any rule matches.
pub fn detect_conference(meeting: &str, url: &str) -> Option<Conference> {
    let meeting = meeting.to_lowercase();
    let url = url.to_lowercase();

    RULES.iter().find_map(|rule| match rule {
        Rule::Url(needle, conf) if url.contains(needle) => Some(*conf),
        Rule::Meeting(needle, conf) if meeting.contains(needle) => Some(*conf),
        _ => None,
    })
}

/// Label form of [`detect_conference`]; empty string when nothing matches.
pub fn classify(meeting: &str, url: &str) -> &'static str {
    detect_conference(meeting, url).map_or("", Conference::label)
}
