/*
 * This file is part of ufdsp.
 *
 * Copyright (C) 2025 ufdsp contributors
 *
 * ufdsp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * ufdsp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ufdsp. If not, see <https://www.gnu.org/licenses/>.
 */

//! ufdsp - Device Support Package tooling
//!
//! Command line front end over `uf-core`: inspect compiled packages, run
//! profile selection against a directory, and exercise the primitive
//! dispatcher end to end.

pub mod cli;
pub mod demo;
pub mod logging;
