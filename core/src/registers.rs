//! Register layouts of the SD14 converter and the RF13M front end.
//!
//! Only the fields this firmware touches are described. Values are handled as
//! [`LocalRegisterCopy`]s so the same definitions serve the memory mapped registers on the target
//! and the simulated peripherals on the host.

use tock_registers::{register_bitfields, LocalRegisterCopy};

register_bitfields![u16,
    /// SD14 control register 0
    pub SD14CTL0 [
        /// Conversion result available
        IFG OFFSET(0) NUMBITS(1) [],

        /// Result overwritten before it was read
        OVIFG OFFSET(1) NUMBITS(1) [],

        /// Result interrupt enable
        IE OFFSET(2) NUMBITS(1) [],

        /// Overflow interrupt enable
        OVIE OFFSET(3) NUMBITS(1) [],

        /// Single conversion (continuous when clear)
        SGL OFFSET(4) NUMBITS(1) [],

        /// Sampling clock divider
        DIV OFFSET(5) NUMBITS(2) [
            By1 = 0,
            By16 = 1,
            By32 = 2,
            By64 = 3
        ],

        /// Sampling clock source
        SSEL OFFSET(7) NUMBITS(1) [
            Aclk = 0,
            Smclk = 1
        ],

        /// Virtual ground as reference, SVSS when clear
        VIRTGND OFFSET(9) NUMBITS(1) [],

        /// Converter enable
        EN OFFSET(10) NUMBITS(1) [],

        /// Start conversion
        SC OFFSET(11) NUMBITS(1) [],
    ],

    /// SD14 control register 1
    pub SD14CTL1 [
        /// Input channel
        INCH OFFSET(0) NUMBITS(3) [
            Adc0 = 0,
            InternalTemperature = 1,
            ThermistorAdc2 = 2,
            ReferenceAdc1 = 3
        ],

        /// CIC filter decimation rate, zero is the fastest
        RATE OFFSET(3) NUMBITS(3) [],

        /// Programmable amplifier gain
        GAIN OFFSET(6) NUMBITS(2) [
            X1 = 0,
            X2 = 1,
            X4 = 2,
            X8 = 3
        ],

        /// Samples taken before the result interrupt is raised
        INTDLY OFFSET(8) NUMBITS(2) [
            FirstSample = 0,
            SecondSample = 1,
            ThirdSample = 2,
            FourthSample = 3
        ],

        /// Unipolar output
        UNI OFFSET(12) NUMBITS(1) [],

        /// Bias current sources into the thermistor and reference resistor
        RBEN OFFSET(14) NUMBITS(2) [
            Off = 0,
            Thermistor = 1,
            Reference = 2,
            Both = 3
        ],
    ],

    /// SD14 interrupt vector, reads as the highest priority pending cause
    pub SD14IV [
        CAUSE OFFSET(0) NUMBITS(4) [
            NotPending = 0,
            Overflow = 2,
            Result = 4
        ],
    ],

    /// RF13M control register
    pub RF13MCTL [
        /// Transmitter enable
        TXEN OFFSET(0) NUMBITS(1) [],

        /// Receiver enable
        RXEN OFFSET(1) NUMBITS(1) [],

        /// RF field timeout detection enable
        RFTOEN OFFSET(2) NUMBITS(1) [],
    ],

    /// RF13M interrupt enable register
    pub RF13MINT [
        /// Frame received
        RXIE OFFSET(0) NUMBITS(1) [],

        /// Frame transmitted
        TXIE OFFSET(1) NUMBITS(1) [],

        /// RF field timeout
        RFTOIE OFFSET(3) NUMBITS(1) [],
    ],
];

pub type Ctl0 = LocalRegisterCopy<u16, SD14CTL0::Register>;
pub type Ctl1 = LocalRegisterCopy<u16, SD14CTL1::Register>;
pub type InterruptVector = LocalRegisterCopy<u16, SD14IV::Register>;

pub type RfControl = LocalRegisterCopy<u16, RF13MCTL::Register>;
pub type RfInterrupts = LocalRegisterCopy<u16, RF13MINT::Register>;
