/// How the remote service expects one language to be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageSpec {
    pub filename: &'static str,
    pub version: &'static str,
}

const GENERIC: LanguageSpec = LanguageSpec { filename: "main.txt", version: "latest" };

/// Lower-cased language key with `c++` folded into `cpp`
pub fn canonical_key(language: &str) -> String {
    let key = language.trim().to_lowercase();
    if key == "c++" {
        "cpp".to_string()
    } else {
        key
    }
}

pub fn language_spec(language: &str) -> LanguageSpec {
    match canonical_key(language).as_str() {
        "cpp" => LanguageSpec { filename: "main.cpp", version: "10.2.0" },
        "c" => LanguageSpec { filename: "main.c", version: "latest" },
        "python" | "python3" | "py" => LanguageSpec { filename: "main.py", version: "3.10.0" },
        "javascript" | "js" | "node" | "nodejs" => LanguageSpec { filename: "main.js", version: "18.15.0" },
        "java" => LanguageSpec { filename: "Main.java", version: "latest" },
        _ => GENERIC,
    }
}

/// Languages the local compile/run sandbox can take over
pub fn supports_local_runner(language: &str) -> bool {
    canonical_key(language) == "cpp"
}

/// Languages executed by the script runner instead of any compiler
pub fn is_browser_script(language: &str) -> bool {
    matches!(canonical_key(language).as_str(), "javascript" | "js")
}
