//! The fixed task surface

use std::fmt;

/// Every task `plump run` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum TaskName {
    Scripts,
    Styles,
    Templates,
    Images,
    Fonts,
    Copy,
    Clean,
    Watch,
    Serve,
    Stage,
    Develop,
    Build,
    Default,
}

/// Leaf tasks `build` runs concurrently
pub const BUILD_TASKS: [TaskName; 6] = [
    TaskName::Images,
    TaskName::Fonts,
    TaskName::Templates,
    TaskName::Styles,
    TaskName::Scripts,
    TaskName::Copy,
];

impl TaskName {
    pub const ALL: [TaskName; 13] = [
        TaskName::Scripts,
        TaskName::Styles,
        TaskName::Templates,
        TaskName::Images,
        TaskName::Fonts,
        TaskName::Copy,
        TaskName::Clean,
        TaskName::Watch,
        TaskName::Serve,
        TaskName::Stage,
        TaskName::Develop,
        TaskName::Build,
        TaskName::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Scripts => "scripts",
            TaskName::Styles => "styles",
            TaskName::Templates => "templates",
            TaskName::Images => "images",
            TaskName::Fonts => "fonts",
            TaskName::Copy => "copy",
            TaskName::Clean => "clean",
            TaskName::Watch => "watch",
            TaskName::Serve => "serve",
            TaskName::Stage => "stage",
            TaskName::Develop => "develop",
            TaskName::Build => "build",
            TaskName::Default => "default",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TaskName::Scripts => "concatenates src/scripts into dev/js and a minified copy into dist/js",
            TaskName::Styles => "compiles the Sass entry point into dev/css and a minified copy into dist/css",
            TaskName::Templates => "renders HTML templates into dev/ and dist/",
            TaskName::Images => "optimises images into dev/images and dist/images",
            TaskName::Fonts => "copies fonts into dev/fonts and dist/fonts",
            TaskName::Copy => "copies any other configured files into dev/ and dist/",
            TaskName::Clean => "removes dev/ and dist/",
            TaskName::Watch => "re-runs tasks when their source files change",
            TaskName::Serve => "serves the contents of dist/ on a static web server",
            TaskName::Stage => "uploads dist/ to the staging server over FTP",
            TaskName::Develop => "builds, watches and serves dev/ with live reload",
            TaskName::Build => "builds the contents of src/ into both dev/ and dist/",
            TaskName::Default => "lists the available tasks",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
