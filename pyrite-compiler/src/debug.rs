// Debug flags, settable with -X on the command line.

pub type DebugFlags = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum DebugFlag {
    ShowSearchDebug = 0x0000_0000_0000_0001,
    ShowSourceDebug = 0x0000_0000_0000_0002,
    ShowLexDebug = 0x0000_0000_0000_0004,
    ShowParseDebug = 0x0000_0000_0000_0008,
    ShowAnnotateDebug = 0x0000_0000_0000_0010,
    ShowAnalyzeDebug = 0x0000_0000_0000_0020,
    ShowCompileDebug = 0x0000_0000_0000_0040,
    ShowAssembly = 0x0000_0000_0000_0080,
    ShowRefcountChanges = 0x0000_0000_0000_0100,
    ShowJITEvents = 0x0000_0000_0000_0200,
    ShowCompileErrors = 0x0000_0000_0000_0400,

    // behavior flags
    NoInlineRefcounting = 0x0000_0001_0000_0000,
    NoEagerCompilation = 0x0000_0002_0000_0000,
}

/// Code = annotate + analyze + compile debug output.
pub const DEBUG_FLAGS_CODE: DebugFlags = DebugFlag::ShowAnnotateDebug as u64
    | DebugFlag::ShowAnalyzeDebug as u64
    | DebugFlag::ShowCompileDebug as u64;

/// Verbose = all debug output, no behavior changes.
pub const DEBUG_FLAGS_VERBOSE: DebugFlags = 0x0000_0000_FFFF_FFFF;

pub const DEBUG_FLAGS_ALL: DebugFlags = 0xFFFF_FFFF_FFFF_FFFF;

/// Parse one -X flag name; unknown names contribute nothing.
pub fn debug_flag_for_name(name: &str) -> DebugFlags {
    match name {
        "ShowSearchDebug" => DebugFlag::ShowSearchDebug as u64,
        "ShowSourceDebug" => DebugFlag::ShowSourceDebug as u64,
        "ShowLexDebug" => DebugFlag::ShowLexDebug as u64,
        "ShowParseDebug" => DebugFlag::ShowParseDebug as u64,
        "ShowAnnotateDebug" => DebugFlag::ShowAnnotateDebug as u64,
        "ShowAnalyzeDebug" => DebugFlag::ShowAnalyzeDebug as u64,
        "ShowCompileDebug" => DebugFlag::ShowCompileDebug as u64,
        "ShowAssembly" => DebugFlag::ShowAssembly as u64,
        "ShowRefcountChanges" => DebugFlag::ShowRefcountChanges as u64,
        "ShowJITEvents" => DebugFlag::ShowJITEvents as u64,
        "ShowCompileErrors" => DebugFlag::ShowCompileErrors as u64,
        "Code" => DEBUG_FLAGS_CODE,
        "Verbose" => DEBUG_FLAGS_VERBOSE,
        "NoInlineRefcounting" => DebugFlag::NoInlineRefcounting as u64,
        "NoEagerCompilation" => DebugFlag::NoEagerCompilation as u64,
        "All" => DEBUG_FLAGS_ALL,
        _ => 0,
    }
}

pub fn flag_enabled(flags: DebugFlags, flag: DebugFlag) -> bool {
    flags & (flag as u64) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert_eq!(
            debug_flag_for_name("ShowLexDebug"),
            DebugFlag::ShowLexDebug as u64
        );
        assert_eq!(debug_flag_for_name("bogus"), 0);
        let code = debug_flag_for_name("Code");
        assert!(flag_enabled(code, DebugFlag::ShowAnnotateDebug));
        assert!(flag_enabled(code, DebugFlag::ShowCompileDebug));
        assert!(!flag_enabled(code, DebugFlag::ShowLexDebug));
        assert!(flag_enabled(
            debug_flag_for_name("Verbose"),
            DebugFlag::ShowAssembly
        ));
        assert!(!flag_enabled(
            debug_flag_for_name("Verbose"),
            DebugFlag::NoEagerCompilation
        ));
    }
}
