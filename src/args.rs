use clap::Parser;

/// This is an aggregation and reporting program for upward leadership evaluations.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file containing the survey configuration in JSON.
    /// For more information about the file format, read the manual of the upward_eval crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the JSON summary of a survey. If provided, upeval will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the report will be written to the given
    /// location. Setting this option overrides the directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the file containing the responses. Setting this option
    /// overrides the response sources that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: json, csv or msforms_likert.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path) The JSON file with the competencies of the survey. Required without --config.
    #[clap(long, value_parser)]
    pub competencies: Option<String>,

    /// (optional) Only keep the responses about the supervisor with this id.
    #[clap(long, value_parser)]
    pub evaluated: Option<String>,

    /// (default json) The format of the report: json, text or html.
    #[clap(long, value_parser)]
    pub format: Option<String>,

    /// If passed as an argument, the report will also contain one page per evaluated supervisor.
    #[clap(long, takes_value = false)]
    pub by_evaluated: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
