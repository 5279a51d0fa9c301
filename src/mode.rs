//! Permission modes as accepted by `chmod` and `mkdir -m`.
//!
//! A mode is either an absolute octal value (`755`, `0640`) or a
//! comma-separated list of symbolic clauses (`u+x,go-w`, `a=rX`).

use crate::error::AppletError;

const PERMISSION_MASK: u32 = 0o7777;

const WHO_USER: u32 = 0o4700;
const WHO_GROUP: u32 = 0o2070;
const WHO_OTHER: u32 = 0o1007;
const WHO_ALL: u32 = PERMISSION_MASK;

/// A parsed `chmod` mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Octal(u32),
    Symbolic(Vec<Clause>),
}

/// `[ugoa]*` followed by one or more `[-+=][rwxXst]*` actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    who: u32,
    actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Action {
    op: Op,
    perms: Vec<Perm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Remove,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Perm {
    Read,
    Write,
    Execute,
    /// Execute only for directories or when some execute bit is already set.
    ConditionalExecute,
    SetId,
    Sticky,
}

impl Mode {
    pub fn parse(input: &str) -> Result<Self, AppletError> {
        let invalid = || AppletError::InvalidMode(input.to_string());
        if input.is_empty() {
            return Err(invalid());
        }
        if input.chars().all(|c| c.is_ascii_digit()) {
            if input.len() > 4 || input.chars().any(|c| c > '7') {
                return Err(invalid());
            }
            let value = u32::from_str_radix(input, 8).map_err(|_| invalid())?;
            return Ok(Mode::Octal(value));
        }
        let clauses = input
            .split(',')
            .map(parse_clause)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;
        Ok(Mode::Symbolic(clauses))
    }

    /// Compute the new permission bits from the current ones.
    pub fn apply(&self, current: u32, is_dir: bool) -> u32 {
        match self {
            Mode::Octal(value) => *value,
            Mode::Symbolic(clauses) => clauses
                .iter()
                .fold(current & PERMISSION_MASK, |mode, clause| {
                    clause.apply(mode, is_dir)
                }),
        }
    }
}

fn parse_clause(text: &str) -> Option<Clause> {
    let mut chars = text.chars().peekable();
    let mut who = 0;
    while let Some(&c) = chars.peek() {
        who |= match c {
            'u' => WHO_USER,
            'g' => WHO_GROUP,
            'o' => WHO_OTHER,
            'a' => WHO_ALL,
            _ => break,
        };
        chars.next();
    }
    if who == 0 {
        who = WHO_ALL;
    }

    let mut actions = Vec::new();
    while let Some(c) = chars.next() {
        let op = match c {
            '+' => Op::Add,
            '-' => Op::Remove,
            '=' => Op::Set,
            _ => return None,
        };
        let mut perms = Vec::new();
        while let Some(&c) = chars.peek() {
            let perm = match c {
                'r' => Perm::Read,
                'w' => Perm::Write,
                'x' => Perm::Execute,
                'X' => Perm::ConditionalExecute,
                's' => Perm::SetId,
                't' => Perm::Sticky,
                '+' | '-' | '=' => break,
                _ => return None,
            };
            perms.push(perm);
            chars.next();
        }
        actions.push(Action { op, perms });
    }
    if actions.is_empty() {
        return None;
    }
    Some(Clause { who, actions })
}

impl Clause {
    fn apply(&self, mut mode: u32, is_dir: bool) -> u32 {
        for action in &self.actions {
            let bits = action
                .perms
                .iter()
                .map(|perm| perm.bits(mode, is_dir))
                .fold(0, |acc, bits| acc | bits)
                & self.who;
            mode = match action.op {
                Op::Add => mode | bits,
                Op::Remove => mode & !bits,
                Op::Set => (mode & !self.who) | bits,
            };
        }
        mode
    }
}

impl Perm {
    fn bits(self, mode: u32, is_dir: bool) -> u32 {
        match self {
            Perm::Read => 0o444,
            Perm::Write => 0o222,
            Perm::Execute => 0o111,
            Perm::ConditionalExecute if is_dir || mode & 0o111 != 0 => 0o111,
            Perm::ConditionalExecute => 0,
            Perm::SetId => 0o6000,
            Perm::Sticky => 0o1000,
        }
    }
}

/// Render permission bits the way `ls -l` does, e.g. `rwxr-sr-T`.
pub fn permission_string(mode: u32) -> String {
    let triple = |shift: u32, special: u32, set: char, unset: char| {
        let r = if mode & (0o4 << shift) != 0 { 'r' } else { '-' };
        let w = if mode & (0o2 << shift) != 0 { 'w' } else { '-' };
        let exec = mode & (0o1 << shift) != 0;
        let x = match (mode & special != 0, exec) {
            (true, true) => set,
            (true, false) => unset,
            (false, true) => 'x',
            (false, false) => '-',
        };
        [r, w, x]
    };
    triple(6, 0o4000, 's', 'S')
        .into_iter()
        .chain(triple(3, 0o2000, 's', 'S'))
        .chain(triple(0, 0o1000, 't', 'T'))
        .collect()
}
