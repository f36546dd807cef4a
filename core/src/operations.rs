use rand::Rng;

use crate::constants::GLYPH_SIZE;
use crate::error::{Error, Result};
use crate::instruction::{Context, Cycle};
use crate::opcode::Opcode;
use crate::state::State;

/// pc += 2
fn next(state: &mut State) {
    state.pc += 0x2;
}

/// if cond then pc += 4 else pc += 2
fn skip_if(state: &mut State, cond: bool) {
    state.pc += if cond { 0x4 } else { 0x2 };
}

/// The source register of a shift; quirks mode shifts Vx in place
fn shift_source(op: &dyn Opcode, state: &State, ctx: &Context) -> u8 {
    if ctx.quirks {
        state.v[op.x() as usize]
    } else {
        state.v[op.y() as usize]
    }
}

fn is_pressed(ctx: &Context, key: u8) -> bool {
    ctx.pressed_keys.get(key as usize).copied().unwrap_or(false)
}

/// clear
pub fn clr(_op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.frame_buffer.clear();
    next(state);
    Ok(Cycle::Redraw)
}

/// PC = STACK.pop()
pub fn rts(_op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.pc = state
        .stack
        .pop()
        .ok_or(Error::EmptyCallStack { address: state.pc })?;
    Ok(Cycle::Ran)
}

/// machine code routine; ignored
pub fn sys(_op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    next(state);
    Ok(Cycle::Ran)
}

/// PC = addr
pub fn jump(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.pc = op.nnn();
    Ok(Cycle::Ran)
}

/// STACK.push(PC + 2); PC = addr
pub fn call(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.stack.push(state.pc + 0x2);
    state.pc = op.nnn();
    Ok(Cycle::Ran)
}

/// if Vx == nn then pc += 2
pub fn ske(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let cond = state.v[op.x() as usize] == op.nn();
    skip_if(state, cond);
    Ok(Cycle::Ran)
}

/// if Vx != nn then pc += 2
pub fn skne(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let cond = state.v[op.x() as usize] != op.nn();
    skip_if(state, cond);
    Ok(Cycle::Ran)
}

/// if Vx == Vy then pc += 2
pub fn skre(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let cond = state.v[op.x() as usize] == state.v[op.y() as usize];
    skip_if(state, cond);
    Ok(Cycle::Ran)
}

/// Vx = nn
pub fn load(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.v[op.x() as usize] = op.nn();
    next(state);
    Ok(Cycle::Ran)
}

/// Vx += nn
/// Add nn to Vx; allow for overflow but implicitly drop it, VF is untouched
pub fn add(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let x = op.x() as usize;
    state.v[x] = state.v[x].wrapping_add(op.nn());
    next(state);
    Ok(Cycle::Ran)
}

/// Vx = Vy
pub fn mv(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.v[op.x() as usize] = state.v[op.y() as usize];
    next(state);
    Ok(Cycle::Ran)
}

/// Vx |= Vy
pub fn or(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.v[op.x() as usize] |= state.v[op.y() as usize];
    next(state);
    Ok(Cycle::Ran)
}

/// Vx &= Vy
pub fn and(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.v[op.x() as usize] &= state.v[op.y() as usize];
    next(state);
    Ok(Cycle::Ran)
}

/// Vx ^= Vy
pub fn xor(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.v[op.x() as usize] ^= state.v[op.y() as usize];
    next(state);
    Ok(Cycle::Ran)
}

/// Vx += Vy; VF = overflow
pub fn addr(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let (res, over) = state.v[op.x() as usize].overflowing_add(state.v[op.y() as usize]);
    state.v[op.x() as usize] = res;
    state.v[0xF] = u8::from(over);
    next(state);
    Ok(Cycle::Ran)
}

/// Vx -= Vy; VF = !underflow
pub fn sub(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let (res, under) = state.v[op.x() as usize].overflowing_sub(state.v[op.y() as usize]);
    state.v[op.x() as usize] = res;
    state.v[0xF] = u8::from(!under);
    next(state);
    Ok(Cycle::Ran)
}

/// Vx = src >> 1; VF = the bit shifted out
pub fn shr(op: &dyn Opcode, state: &mut State, ctx: &mut Context) -> Result<Cycle> {
    let src = shift_source(op, state, ctx);
    state.v[op.x() as usize] = src >> 1;
    state.v[0xF] = src & 0x1;
    next(state);
    Ok(Cycle::Ran)
}

/// Vx = Vy - Vx; VF = !underflow
pub fn subn(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let (res, under) = state.v[op.y() as usize].overflowing_sub(state.v[op.x() as usize]);
    state.v[op.x() as usize] = res;
    state.v[0xF] = u8::from(!under);
    next(state);
    Ok(Cycle::Ran)
}

/// Vx = src << 1; VF = the bit shifted out
pub fn shl(op: &dyn Opcode, state: &mut State, ctx: &mut Context) -> Result<Cycle> {
    let src = shift_source(op, state, ctx);
    state.v[op.x() as usize] = src << 1;
    state.v[0xF] = (src >> 7) & 0x1;
    next(state);
    Ok(Cycle::Ran)
}

/// if Vx != Vy then pc +=2
pub fn skrne(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let cond = state.v[op.x() as usize] != state.v[op.y() as usize];
    skip_if(state, cond);
    Ok(Cycle::Ran)
}

/// I = addr
pub fn loadi(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.i = op.nnn();
    next(state);
    Ok(Cycle::Ran)
}

/// PC = V0 + addr
pub fn jumpi(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.pc = u16::from(state.v[0x0]) + op.nnn();
    Ok(Cycle::Ran)
}

/// Vx = rand_byte & nn
pub fn rand(op: &dyn Opcode, state: &mut State, ctx: &mut Context) -> Result<Cycle> {
    let rand_byte: u8 = ctx.rng.gen();
    state.v[op.x() as usize] = rand_byte & op.nn();
    next(state);
    Ok(Cycle::Ran)
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n at position x, y on the FrameBuffer with wrapping.
/// Sets VF if any pixels were erased
pub fn draw(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let x = state.v[op.x() as usize] as usize;
    let y = state.v[op.y() as usize] as usize;
    let sprite = state.memory.read(state.i, op.n() as usize)?;
    let collision = state.frame_buffer.draw(x, y, sprite);
    state.v[0xF] = u8::from(collision);
    next(state);
    Ok(Cycle::Redraw)
}

/// if Vx.pressed then pc += 2
pub fn skpr(op: &dyn Opcode, state: &mut State, ctx: &mut Context) -> Result<Cycle> {
    let cond = is_pressed(ctx, state.v[op.x() as usize]);
    skip_if(state, cond);
    Ok(Cycle::Ran)
}

/// if !Vx.pressed then pc += 2
pub fn skup(op: &dyn Opcode, state: &mut State, ctx: &mut Context) -> Result<Cycle> {
    let cond = !is_pressed(ctx, state.v[op.x() as usize]);
    skip_if(state, cond);
    Ok(Cycle::Ran)
}

/// Vx = DT
pub fn moved(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.v[op.x() as usize] = state.delay_timer;
    next(state);
    Ok(Cycle::Ran)
}

/// await keypress for Vx
pub fn keyd(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.register_needing_key = Some(op.x());
    next(state);
    Ok(Cycle::AwaitingKey)
}

/// DT = Vx
pub fn loads(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.delay_timer = state.v[op.x() as usize];
    next(state);
    Ok(Cycle::Ran)
}

/// ST = Vx
pub fn ld(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.sound_timer = state.v[op.x() as usize];
    next(state);
    Ok(Cycle::Ran)
}

/// I += Vx
/// Wraps at 16 bits; I is never masked to 12
pub fn addi(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.i = state.i.wrapping_add(u16::from(state.v[op.x() as usize]));
    next(state);
    Ok(Cycle::Ran)
}

/// I = Vx * 5
/// Set I to the memory address of the glyph for Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    state.i = u16::from(state.v[op.x() as usize]) * GLYPH_SIZE;
    next(state);
    Ok(Cycle::Ran)
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(op: &dyn Opcode, state: &mut State, _ctx: &mut Context) -> Result<Cycle> {
    let value = state.v[op.x() as usize];
    state
        .memory
        .write(state.i, &[value / 100 % 10, value / 10 % 10, value % 10])?;
    next(state);
    Ok(Cycle::Ran)
}

/// mem[I..=I+x] = V0..=Vx
/// Fill memory starting at address i with V0..=Vx, then I += x + 1 unless in quirks mode
pub fn stor(op: &dyn Opcode, state: &mut State, ctx: &mut Context) -> Result<Cycle> {
    let x = op.x() as usize;
    state.memory.write(state.i, &state.v[..=x])?;
    if !ctx.quirks {
        state.i = state.i.wrapping_add(x as u16 + 1);
    }
    next(state);
    Ok(Cycle::Ran)
}

/// V0..=Vx = mem[I..=I+x]
/// Fill V0..=Vx with memory starting at address i, then I += x + 1 unless in quirks mode
pub fn read(op: &dyn Opcode, state: &mut State, ctx: &mut Context) -> Result<Cycle> {
    let x = op.x() as usize;
    let bytes = state.memory.read(state.i, x + 1)?;
    state.v[..=x].copy_from_slice(bytes);
    if !ctx.quirks {
        state.i = state.i.wrapping_add(x as u16 + 1);
    }
    next(state);
    Ok(Cycle::Ran)
}
