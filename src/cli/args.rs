// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// rmsearch - Parse repeat-search engine reports, rescore alignments and write RepeatMasker style results
pub struct Args {
    /// engine report to parse (use - for stdin)
    #[argh(option)]
    pub report: Option<String>,

    /// engine command line to execute; its stdout is parsed instead of --report
    #[argh(option)]
    pub run: Option<String>,

    /// report grammar: crossmatch, ncbi, rmblast, wublast, wublastx, decypher (default: crossmatch)
    #[argh(option, default = "String::from(\"crossmatch\")")]
    pub engine: String,

    /// output results file
    #[argh(option)]
    pub output: Option<String>,

    /// output format: caf, cigar, align, out, tsv, json, bed (default: caf)
    #[argh(option, default = "String::from(\"caf\")")]
    pub format: String,

    /// scoring matrix file (required for --rescore and --x-drop)
    #[argh(option)]
    pub matrix: Option<String>,

    /// recompute scores from the alignments with --matrix
    #[argh(switch)]
    pub rescore: bool,

    /// gap open penalty, negative (default: engine default)
    #[argh(option)]
    pub gap_init: Option<i32>,

    /// insertion extension penalty, negative (default: engine default)
    #[argh(option)]
    pub ins_gap_ext: Option<i32>,

    /// deletion extension penalty, negative (default: engine default)
    #[argh(option)]
    pub del_gap_ext: Option<i32>,

    /// score CpG transitions as matches when rescoring
    #[argh(switch)]
    pub score_cpg_mod: bool,

    /// count CpG transitions at reduced weight in Kimura divergence
    #[argh(switch)]
    pub div_cpg_mod: bool,

    /// apply the composition based complexity adjustment to rescored hits
    #[argh(switch)]
    pub complexity_adjust: bool,

    /// split hits into xDrop fragments using this drop-off (requires --matrix)
    #[argh(option)]
    pub x_drop: Option<i32>,

    /// annotate every hit with its Kimura divergence
    #[argh(switch)]
    pub kimura: bool,

    /// drop hits scoring below this value
    #[argh(option)]
    pub min_score: Option<i32>,

    /// cross_match masklevel filter (0-100, 100 keeps everything)
    #[argh(option)]
    pub mask_level: Option<u32>,

    /// keep only subjects matching regex pattern
    #[argh(option)]
    pub include_subjects: Option<String>,

    /// drop subjects matching regex pattern
    #[argh(option)]
    pub exclude_subjects: Option<String>,

    /// drop hits spanning fewer query bases than this
    #[argh(option)]
    pub min_length: Option<usize>,

    /// drop hits less diverged than this percentage (Kimura when annotated)
    #[argh(option)]
    pub min_divergence: Option<f64>,

    /// drop hits more diverged than this percentage (Kimura when annotated)
    #[argh(option)]
    pub max_divergence: Option<f64>,

    /// make annotations disjoint: higher_score, longer_element, lower_divergence
    #[argh(option)]
    pub overlap_resolution: Option<String>,

    /// also write one file per family, class or subclass next to --output
    #[argh(option)]
    pub split: Option<String>,

    /// skip split files holding fewer hits than this (default: 1)
    #[argh(option)]
    pub min_split_hits: Option<usize>,

    /// sort order: query, score, family, class, subclass, length, divergence, none (default: query)
    #[argh(option, default = "String::from(\"query\")")]
    pub sort: String,

    /// do not keep aligned strings once percentages are computed
    #[argh(switch)]
    pub exclude_alignments: bool,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// cache file path for parsed results (.lz4 extension)
    #[argh(option)]
    pub cache_file: Option<String>,

    /// user note to save with the cache for future reference
    #[argh(option)]
    pub cache_note: Option<String>,

    /// list available engines and exit
    #[argh(switch)]
    pub list_engines: bool,

    /// print matrix statistics (lambda, expected score) and exit
    #[argh(switch)]
    pub matrix_info: bool,

    /// validate inputs without parsing (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            report: None,
            run: None,
            engine: "crossmatch".to_string(),
            output: None,
            format: "caf".to_string(),
            matrix: None,
            rescore: false,
            gap_init: None,
            ins_gap_ext: None,
            del_gap_ext: None,
            score_cpg_mod: false,
            div_cpg_mod: false,
            complexity_adjust: false,
            x_drop: None,
            kimura: false,
            min_score: None,
            mask_level: None,
            include_subjects: None,
            exclude_subjects: None,
            min_length: None,
            min_divergence: None,
            max_divergence: None,
            overlap_resolution: None,
            split: None,
            min_split_hits: None,
            sort: "query".to_string(),
            exclude_alignments: false,
            threads: None,
            cache_file: None,
            cache_note: None,
            list_engines: false,
            matrix_info: false,
            dry_run: false,
            config: None,
            generate_config: false,
        }
    }
}
