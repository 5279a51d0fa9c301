use crate::exit_codes::exit;
use std::fmt;

/// One of the commands the binary dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Applet {
    Pwd,
    Echo,
    Cat,
    Mkdir,
    Mv,
    Ln,
    Rmdir,
    Rm,
    Ls,
    Cp,
    Touch,
    Chmod,
}

impl Applet {
    pub const ALL: [Applet; 12] = [
        Applet::Pwd,
        Applet::Echo,
        Applet::Cat,
        Applet::Mkdir,
        Applet::Mv,
        Applet::Ln,
        Applet::Rmdir,
        Applet::Rm,
        Applet::Ls,
        Applet::Cp,
        Applet::Touch,
        Applet::Chmod,
    ];

    /// Look up an applet by the name typed on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|applet| applet.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Applet::Pwd => "pwd",
            Applet::Echo => "echo",
            Applet::Cat => "cat",
            Applet::Mkdir => "mkdir",
            Applet::Mv => "mv",
            Applet::Ln => "ln",
            Applet::Rmdir => "rmdir",
            Applet::Rm => "rm",
            Applet::Ls => "ls",
            Applet::Cp => "cp",
            Applet::Touch => "touch",
            Applet::Chmod => "chmod",
        }
    }

    /// Exit code used when this applet fails.
    pub fn exit_code(self) -> i32 {
        match self {
            Applet::Pwd => exit::PWD,
            Applet::Echo => exit::ECHO,
            Applet::Cat => exit::CAT,
            Applet::Mkdir => exit::MKDIR,
            Applet::Mv => exit::MV,
            Applet::Ln => exit::LN,
            Applet::Rmdir => exit::RMDIR,
            Applet::Rm => exit::RM,
            Applet::Ls => exit::LS,
            Applet::Cp => exit::CP,
            Applet::Touch => exit::TOUCH,
            Applet::Chmod => exit::CHMOD,
        }
    }
}

impl fmt::Display for Applet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
