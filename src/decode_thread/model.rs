// MZoom6 -- Tiled zoom, pan and rotate engine for very large images
//
// Copyright (c) 2024-2025 Martin van der Werff <github (at) newinnovations.nl>
//
// This file is part of MZoom6.
//
// MZoom6 is free software: you can redistribute it and/or modify it under the terms of
// the GNU Affero General Public License as published by the Free Software Foundation, either
// version 3 of the License, or (at your option) any later version.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR
// IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND
// FITNESS FOR A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR ANY
// DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR
// BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT,
// STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::{error::MzoomError, rect::RectI, tiles::tile::TileKey, tiles::TileImage};

/// Work order for the decode workers. The epoch stamps which image session
/// the command belongs to; workers skip commands from a superseded epoch.
#[derive(Debug)]
pub struct DecodeCommandMessage {
    pub epoch: u64,
    pub cmd: DecodeCommand,
}

#[derive(Debug)]
pub enum DecodeCommand {
    Decode {
        key: TileKey,
        src_rect: RectI,
        sample_size: u32,
    },
}

/// Completion sent back to the owning thread, which re-checks that the tile
/// is still wanted before committing the result.
#[derive(Debug)]
pub struct DecodeReplyMessage {
    pub epoch: u64,
    pub reply: DecodeReply,
}

#[derive(Debug)]
pub enum DecodeReply {
    Done {
        key: TileKey,
        result: Result<TileImage, MzoomError>,
    },
}
