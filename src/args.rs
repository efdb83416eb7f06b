use clap::{Parser, Subcommand};

/// Review and annotate the items of a survey catalog, one item at a time.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the catalog, the record store and the form revision.
    /// Relative paths inside the file are resolved against the directory of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The catalog to review (CSV or XLSX). Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (directory) Where the records are stored. Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub store: Option<String>,

    /// (statusReview or adequacyReview, default statusReview) The form revision. Setting this option overrides
    /// the formRevision that may be specified with the --config option.
    #[clap(long, value_parser)]
    pub revision: Option<String>,

    /// The name of the reviewer. Required to start a session.
    #[clap(short, long, value_parser)]
    pub reviewer: Option<String>,

    /// (column=value, repeatable) Only present the items with this value in this column.
    #[clap(short, long, value_parser)]
    pub filter: Vec<String>,

    /// (text) Only present the items whose content contains this text (case insensitive).
    #[clap(long, value_parser)]
    pub search: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Go through the candidate items interactively.
    Annotate,
    /// Print the item at the given position among the candidates.
    Show {
        #[clap(long, value_parser, default_value_t = 0)]
        offset: usize,
    },
    /// Record a judgment for the item at the given position among the candidates.
    Submit {
        #[clap(long, value_parser, default_value_t = 0)]
        offset: usize,
        /// (approve, reject, suggest_wording or new_item) For the statusReview revision.
        #[clap(long, value_parser)]
        status: Option<String>,
        /// (adequate, partial or inadequate) For the adequacyReview revision.
        #[clap(long, value_parser)]
        adequacy: Option<String>,
        /// (1 to 5) For the adequacyReview revision.
        #[clap(long, value_parser)]
        relevance: Option<String>,
        /// Mandatory when the adequacy is partial.
        #[clap(long, value_parser)]
        justification: Option<String>,
        #[clap(long, value_parser)]
        comment: Option<String>,
        /// Mandatory when the status is new_item.
        #[clap(long, value_parser)]
        new_item_text: Option<String>,
    },
    /// Print the progress of the reviewer and a summary of the judgments.
    Progress,
    /// List the values of a category column, within the other filters.
    Categories { column: String },
}
