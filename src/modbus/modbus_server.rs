// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server implementation for the flow bridge
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! ## Register Map
//!
//! ### Holding Registers (Read Only)
//!
//! | Register Address | Description | Unit |
//! |-----------------|-------------|------|
//! | 0-1 | Sensor frequency | Hz |
//! | 2-3 | Flow rate | units/min |
//! | 4-5 | Fill time | s |
//!
//! Every value is an `f32` spread over two registers, low word first, see
//! [`float_codec`](super::float_codec). The same registers are also served
//! as input registers.
//!
//! The register publisher is the only writer of these registers; write
//! requests from clients are refused.

use std::future;

use log::{debug, error};

use tokio_modbus::prelude::*;

use super::register_map::{RegisterError, RegisterMap};

/// Unit id addressing the TCP device itself, always accepted
pub const TCP_DEVICE_UNIT_ID: u8 = 0xFF;

/// A Modbus TCP service exposing the flow bridge register map.
///
/// One instance is created per client connection; all instances share the
/// same [`RegisterMap`].
pub struct FlowModbusServer {
    registers: RegisterMap,
    unit_id: u8,
}

impl tokio_modbus::server::Service for FlowModbusServer {
    type Request = SlaveRequest<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// This method handles different Modbus function codes:
    /// - 0x03: Read Holding Registers
    /// - 0x04: Read Input Registers
    /// - 0x06 and 0x10 are refused with IllegalDataAddress
    ///
    /// Any other function code will return an IllegalFunction exception.
    fn call(&self, req: Self::Request) -> Self::Future {
        let SlaveRequest { slave, request } = req;
        debug!("Received Modbus request for unit {}: {:?}", slave, request);

        if slave != self.unit_id && slave != TCP_DEVICE_UNIT_ID {
            debug!(
                "Ignoring request for unit {}, serving unit {}",
                slave, self.unit_id
            );
            return future::ready(Err(ExceptionCode::GatewayTargetDevice));
        }

        let res = match request {
            Request::ReadHoldingRegisters(addr, cnt) => {
                debug!(
                    "Reading {} holding registers starting from address {}",
                    cnt, addr
                );
                register_read(&self.registers, addr, cnt).map(Response::ReadHoldingRegisters)
            }
            Request::ReadInputRegisters(addr, cnt) => {
                debug!(
                    "Reading {} input registers starting from address {}",
                    cnt, addr
                );
                register_read(&self.registers, addr, cnt).map(Response::ReadInputRegisters)
            }
            Request::WriteSingleRegister(addr, _) | Request::WriteMultipleRegisters(addr, _) => {
                error!(
                    "Exception::IllegalDataAddress - Register {} is published by the bridge and read-only",
                    addr
                );
                Err(ExceptionCode::IllegalDataAddress)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {request:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

impl FlowModbusServer {
    /// Create a service over `registers` answering to `unit_id`
    pub fn new(registers: RegisterMap, unit_id: u8) -> Self {
        Self { registers, unit_id }
    }
}

/// Read registers and translate map errors into Modbus exceptions
fn register_read(registers: &RegisterMap, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
    registers.read_points(addr, cnt).map_err(|err| match err {
        RegisterError::IllegalAddress(reg_addr) => {
            error!(
                "Exception::IllegalDataAddress - Register {} not found",
                reg_addr
            );
            ExceptionCode::IllegalDataAddress
        }
        RegisterError::Poisoned => {
            error!("Exception::ServerDeviceFailure - {}", err);
            ExceptionCode::ServerDeviceFailure
        }
    })
}
