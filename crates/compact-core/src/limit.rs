//! Newton step limiting for junction and channel voltages.
//!
//! Each limiter takes the candidate voltage proposed by the solver and the
//! value from the previous iteration, and returns a damped candidate. When
//! the candidate equals the previous value it is returned unchanged.

/// Critical voltage of a junction: the point beyond which the exponential is
/// steep enough that steps must be compressed logarithmically.
///
/// A zero saturation current gives an infinite critical voltage, which
/// disables junction limiting.
pub fn critical_voltage(vt: f64, is: f64) -> f64 {
    vt * (vt / (std::f64::consts::SQRT_2 * is)).ln()
}

/// Limit a PN junction voltage.
///
/// Returns the limited voltage and whether limiting changed it.
pub fn pnjlim(vnew: f64, vold: f64, vt: f64, vcrit: f64) -> (f64, bool) {
    if vnew == vold {
        return (vnew, false);
    }
    if vnew > vcrit && (vnew - vold).abs() > vt + vt {
        let limited = if vold > 0.0 {
            let arg = 1.0 + (vnew - vold) / vt;
            if arg > 0.0 { vold + vt * arg.ln() } else { vcrit }
        } else {
            vt * (vnew / vt).ln()
        };
        return (limited, true);
    }
    if vnew < 0.0 {
        // Large reverse steps are clamped too so breakdown-free junctions
        // cannot swing arbitrarily far negative in one iteration.
        let floor = if vold > 0.0 { -vold - 1.0 } else { 2.0 * vold - 1.0 };
        if vnew < floor {
            return (floor, true);
        }
    }
    (vnew, false)
}

/// Limit a gate-source (or gate-drain) voltage around the threshold `vto`.
pub fn fetlim(vnew: f64, vold: f64, vto: f64) -> f64 {
    if vnew == vold {
        return vnew;
    }
    let vtsthi = (2.0 * (vold - vto)).abs() + 2.0;
    let vtstlo = (vold - vto).abs() + 1.0;
    let vtox = vto + 3.5;
    let delv = vnew - vold;

    if vold >= vto {
        if vold >= vtox {
            if delv <= 0.0 {
                // Turning off.
                if vnew >= vtox {
                    if -delv > vtstlo {
                        return vold - vtstlo;
                    }
                    vnew
                } else {
                    vnew.max(vto + 2.0)
                }
            } else if delv >= vtsthi {
                vold + vtsthi
            } else {
                vnew
            }
        } else if delv <= 0.0 {
            vnew.max(vto - 0.5)
        } else {
            vnew.min(vto + 4.0)
        }
    } else if delv <= 0.0 {
        if -delv > vtsthi { vold - vtsthi } else { vnew }
    } else {
        let vtemp = vto + 0.5;
        if vnew <= vtemp {
            if delv > vtstlo { vold + vtstlo } else { vnew }
        } else {
            vtemp
        }
    }
}

/// Limit a drain-source voltage.
pub fn limvds(vnew: f64, vold: f64) -> f64 {
    if vnew == vold {
        return vnew;
    }
    if vold >= 3.5 {
        if vnew > vold {
            vnew.min(3.0 * vold + 2.0)
        } else if vnew < 3.5 {
            vnew.max(2.0)
        } else {
            vnew
        }
    } else if vnew > vold {
        vnew.min(4.0)
    } else {
        vnew.max(-0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VT: f64 = 0.025864;

    #[test]
    fn test_fixed_point() {
        let vcrit = critical_voltage(VT, 1e-14);
        for v in [-7.0, -0.6, 0.0, 0.3, 0.9, 5.0] {
            assert_eq!(pnjlim(v, v, VT, vcrit), (v, false));
            assert_eq!(fetlim(v, v, 0.7), v);
            assert_eq!(limvds(v, v), v);
        }
    }

    #[test]
    fn test_critical_voltage() {
        let vcrit = critical_voltage(VT, 1e-14);
        assert!(vcrit > 0.6 && vcrit < 0.8);
        assert!(critical_voltage(VT, 0.0).is_infinite());
    }

    #[test]
    fn test_pnjlim_compresses_forward_step() {
        let vcrit = critical_voltage(VT, 1e-14);
        let (v, limited) = pnjlim(5.0, 0.6, VT, vcrit);
        assert!(limited);
        assert!(v > 0.6 && v < 1.0);

        // From reverse bias the step is compressed onto the log curve.
        let (v, limited) = pnjlim(2.0, -1.0, VT, vcrit);
        assert!(limited);
        assert!((v - VT * (2.0 / VT).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_pnjlim_reverse_floor() {
        let (v, limited) = pnjlim(-10.0, 0.5, VT, 0.7);
        assert!(limited);
        assert!((v + 1.5).abs() < 1e-12);

        let (v, limited) = pnjlim(-0.5, 0.0, VT, 0.7);
        assert!(!limited);
        assert_eq!(v, -0.5);
    }

    #[test]
    fn test_small_steps_pass_through() {
        let vcrit = critical_voltage(VT, 1e-14);
        assert_eq!(pnjlim(0.61, 0.6, VT, vcrit), (0.61, false));
        assert_eq!(fetlim(1.2, 1.0, 0.7), 1.2);
        assert_eq!(limvds(1.5, 1.0), 1.5);
    }

    #[test]
    fn test_fetlim_bounds_turn_on() {
        // Off device jumping far above threshold stops at vto + 0.5.
        assert!((fetlim(10.0, 0.0, 0.7) - 1.2).abs() < 1e-12);
        // Strongly on device going up is bounded by vtsthi.
        let v = fetlim(50.0, 5.0, 0.7);
        assert!((v - (5.0 + 2.0 * 4.3 + 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_limvds_bounds() {
        assert_eq!(limvds(10.0, 1.0), 4.0);
        assert_eq!(limvds(-3.0, 1.0), -0.5);
        assert_eq!(limvds(20.0, 4.0), 14.0);
        assert_eq!(limvds(0.0, 4.0), 2.0);
    }
}
