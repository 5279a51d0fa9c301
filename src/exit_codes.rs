/// Process exit codes. Every applet fails with its own fixed negative code.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = -1;
    pub const PWD: i32 = -5;
    pub const ECHO: i32 = -10;
    pub const CAT: i32 = -20;
    pub const CHMOD: i32 = -25;
    pub const MKDIR: i32 = -30;
    pub const MV: i32 = -40;
    pub const LN: i32 = -50;
    pub const RMDIR: i32 = -60;
    pub const RM: i32 = -70;
    pub const LS: i32 = -80;
    pub const CP: i32 = -90;
    pub const TOUCH: i32 = -100;
}
