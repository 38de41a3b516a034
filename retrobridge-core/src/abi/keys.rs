//! Keyboard key codes (`retro_key`) and modifier bits (`retro_mod`).
//!
//! Codes index the keyboard device in `retro_input_state_t` and are reported by
//! `retro_keyboard_event_t`.

pub const UNKNOWN: u32 = 0;
pub const BACKSPACE: u32 = 8;
pub const TAB: u32 = 9;
pub const CLEAR: u32 = 12;
pub const RETURN: u32 = 13;
pub const PAUSE: u32 = 19;
pub const ESCAPE: u32 = 27;
pub const SPACE: u32 = 32;
pub const EXCLAIM: u32 = 33;
pub const QUOTEDBL: u32 = 34;
pub const HASH: u32 = 35;
pub const DOLLAR: u32 = 36;
pub const AMPERSAND: u32 = 38;
pub const QUOTE: u32 = 39;
pub const LEFTPAREN: u32 = 40;
pub const RIGHTPAREN: u32 = 41;
pub const ASTERISK: u32 = 42;
pub const PLUS: u32 = 43;
pub const COMMA: u32 = 44;
pub const MINUS: u32 = 45;
pub const PERIOD: u32 = 46;
pub const SLASH: u32 = 47;
pub const NUM_0: u32 = 48;
pub const NUM_1: u32 = 49;
pub const NUM_2: u32 = 50;
pub const NUM_3: u32 = 51;
pub const NUM_4: u32 = 52;
pub const NUM_5: u32 = 53;
pub const NUM_6: u32 = 54;
pub const NUM_7: u32 = 55;
pub const NUM_8: u32 = 56;
pub const NUM_9: u32 = 57;
pub const COLON: u32 = 58;
pub const SEMICOLON: u32 = 59;
pub const LESS: u32 = 60;
pub const EQUALS: u32 = 61;
pub const GREATER: u32 = 62;
pub const QUESTION: u32 = 63;
pub const AT: u32 = 64;
pub const LEFTBRACKET: u32 = 91;
pub const BACKSLASH: u32 = 92;
pub const RIGHTBRACKET: u32 = 93;
pub const CARET: u32 = 94;
pub const UNDERSCORE: u32 = 95;
pub const BACKQUOTE: u32 = 96;
pub const A: u32 = 97;
pub const B: u32 = 98;
pub const C: u32 = 99;
pub const D: u32 = 100;
pub const E: u32 = 101;
pub const F: u32 = 102;
pub const G: u32 = 103;
pub const H: u32 = 104;
pub const I: u32 = 105;
pub const J: u32 = 106;
pub const K: u32 = 107;
pub const L: u32 = 108;
pub const M: u32 = 109;
pub const N: u32 = 110;
pub const O: u32 = 111;
pub const P: u32 = 112;
pub const Q: u32 = 113;
pub const R: u32 = 114;
pub const S: u32 = 115;
pub const T: u32 = 116;
pub const U: u32 = 117;
pub const V: u32 = 118;
pub const W: u32 = 119;
pub const X: u32 = 120;
pub const Y: u32 = 121;
pub const Z: u32 = 122;
pub const LEFTBRACE: u32 = 123;
pub const BAR: u32 = 124;
pub const RIGHTBRACE: u32 = 125;
pub const TILDE: u32 = 126;
pub const DELETE: u32 = 127;
pub const KP0: u32 = 256;
pub const KP1: u32 = 257;
pub const KP2: u32 = 258;
pub const KP3: u32 = 259;
pub const KP4: u32 = 260;
pub const KP5: u32 = 261;
pub const KP6: u32 = 262;
pub const KP7: u32 = 263;
pub const KP8: u32 = 264;
pub const KP9: u32 = 265;
pub const KP_PERIOD: u32 = 266;
pub const KP_DIVIDE: u32 = 267;
pub const KP_MULTIPLY: u32 = 268;
pub const KP_MINUS: u32 = 269;
pub const KP_PLUS: u32 = 270;
pub const KP_ENTER: u32 = 271;
pub const KP_EQUALS: u32 = 272;
pub const UP: u32 = 273;
pub const DOWN: u32 = 274;
pub const RIGHT: u32 = 275;
pub const LEFT: u32 = 276;
pub const INSERT: u32 = 277;
pub const HOME: u32 = 278;
pub const END: u32 = 279;
pub const PAGEUP: u32 = 280;
pub const PAGEDOWN: u32 = 281;
pub const F1: u32 = 282;
pub const F2: u32 = 283;
pub const F3: u32 = 284;
pub const F4: u32 = 285;
pub const F5: u32 = 286;
pub const F6: u32 = 287;
pub const F7: u32 = 288;
pub const F8: u32 = 289;
pub const F9: u32 = 290;
pub const F10: u32 = 291;
pub const F11: u32 = 292;
pub const F12: u32 = 293;
pub const F13: u32 = 294;
pub const F14: u32 = 295;
pub const F15: u32 = 296;
pub const NUMLOCK: u32 = 300;
pub const CAPSLOCK: u32 = 301;
pub const SCROLLOCK: u32 = 302;
pub const RSHIFT: u32 = 303;
pub const LSHIFT: u32 = 304;
pub const RCTRL: u32 = 305;
pub const LCTRL: u32 = 306;
pub const RALT: u32 = 307;
pub const LALT: u32 = 308;
pub const RMETA: u32 = 309;
pub const LMETA: u32 = 310;
pub const LSUPER: u32 = 311;
pub const RSUPER: u32 = 312;
pub const MODE: u32 = 313;
pub const COMPOSE: u32 = 314;
pub const HELP: u32 = 315;
pub const PRINT: u32 = 316;
pub const SYSREQ: u32 = 317;
pub const BREAK: u32 = 318;
pub const MENU: u32 = 319;
pub const POWER: u32 = 320;
pub const EURO: u32 = 321;
pub const UNDO: u32 = 322;
pub const OEM_102: u32 = 323;
/// One past the highest key code.
pub const LAST: u32 = 324;

/// Modifier bits passed as `key_modifiers`.
pub mod modifiers {
    pub const NONE: u16 = 0x0000;
    pub const SHIFT: u16 = 0x01;
    pub const CTRL: u16 = 0x02;
    pub const ALT: u16 = 0x04;
    pub const META: u16 = 0x08;
    pub const NUMLOCK: u16 = 0x10;
    pub const CAPSLOCK: u16 = 0x20;
    pub const SCROLLOCK: u16 = 0x40;
}
